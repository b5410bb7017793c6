//! Frame-loop helper bundling the visible renderer and the picker.

use pollster::FutureExt;

use instapick_core::{FrameThrottle, Options, PickedObject, Scene, SyncStats};
use instapick_render::{Camera, GpuContext, Picker, RenderResult, SceneRenderer};

/// Drives one viewport: renders the shaded scene every frame, refreshes the
/// pick buffer on throttled frames and answers pointer queries in between.
///
/// # Example
/// ```no_run
/// use instapick::*;
///
/// let mut scene = Scene::new();
/// let cube = scene.add(SceneObject::mesh("cube", MeshGeometry::cuboid(1.0, 1.0, 1.0), ShadingMaterial::default()));
///
/// let mut session = PickingSession::new_headless(640, 480, Options::default()).unwrap();
/// session.render_frame(&scene).unwrap();
/// assert_eq!(session.pick(320, 240).map(|p| p.object), Some(cube));
/// ```
pub struct PickingSession {
    gpu: GpuContext,
    renderer: SceneRenderer,
    picker: Picker,
    camera: Camera,
    throttle: FrameThrottle,
    options: Options,
    last_sync: Option<SyncStats>,
}

impl PickingSession {
    /// Creates a session on a new headless GPU context.
    pub fn new_headless(width: u32, height: u32, options: Options) -> RenderResult<Self> {
        let gpu = GpuContext::new_headless().block_on()?;
        Self::with_context(gpu, width, height, options)
    }

    /// Creates a session on an existing GPU context.
    pub fn with_context(gpu: GpuContext, width: u32, height: u32, options: Options) -> RenderResult<Self> {
        let renderer = SceneRenderer::new(&gpu.device, width, height, options.shading)?;
        let picker = Picker::new(&gpu.device);
        let mut camera = Camera::default();
        camera.set_viewport(width, height);
        Ok(Self {
            gpu,
            renderer,
            picker,
            camera,
            throttle: FrameThrottle::from(&options.picker),
            options,
            last_sync: None,
        })
    }

    /// Renders one frame and, if the throttle fires and picking is enabled,
    /// refreshes the pick buffer with the same camera. Returns whether the
    /// pick buffer was refreshed.
    pub fn render_frame(&mut self, scene: &Scene) -> RenderResult<bool> {
        self.renderer.render(&self.gpu, scene, &self.camera);
        if !self.throttle.tick() || !self.options.picker.enabled {
            return Ok(false);
        }
        self.refresh_picker(scene)?;
        Ok(true)
    }

    /// Refreshes the pick buffer now, regardless of the throttle.
    pub fn refresh_picker(&mut self, scene: &Scene) -> RenderResult<SyncStats> {
        let stats = self
            .picker
            .refresh(&self.gpu, scene, &self.camera, self.renderer.size())?;
        self.last_sync = Some(stats);
        Ok(stats)
    }

    /// Decodes the object under a pointer position against the last pick
    /// buffer. Always `None` while picking is disabled.
    pub fn pick(&self, x: i32, y: i32) -> Option<PickedObject> {
        if !self.options.picker.enabled {
            return None;
        }
        self.picker.query(x, y)
    }

    /// Resizes the viewport and updates the camera aspect ratio. The pick
    /// target follows on the next refresh.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.renderer.resize(&self.gpu.device, width, height)?;
        self.camera.set_viewport(width, height);
        Ok(())
    }

    /// Turns picking on or off. Queries return `None` while off and the
    /// pick buffer stops refreshing.
    pub fn set_picking_enabled(&mut self, enabled: bool) {
        self.options.picker.enabled = enabled;
    }

    /// The active options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current viewport size.
    pub fn size(&self) -> (u32, u32) {
        self.renderer.size()
    }

    /// The camera used by both passes.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The picker.
    pub fn picker(&self) -> &Picker {
        &self.picker
    }

    /// The GPU context.
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Statistics of the most recent mirror synchronization.
    pub fn last_sync(&self) -> Option<SyncStats> {
        self.last_sync
    }

    /// Reads back the last rendered frame as RGBA rows, top row first.
    pub fn capture(&self) -> RenderResult<Vec<u8>> {
        self.renderer.capture(&self.gpu)
    }
}
