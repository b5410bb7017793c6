//! Color-ID picker.
//!
//! [`Picker::refresh`] resynchronizes the picking mirror with the scene,
//! renders the mirror into the off-screen pick target with the caller's
//! camera and reads the pixels back. [`Picker::query`] then decodes any
//! screen coordinate against that buffer without touching the GPU, so it is
//! cheap enough to run on every pointer move. How often to refresh is up to
//! the caller (see [`instapick_core::FrameThrottle`]).

use std::path::Path;

use image::{ImageBuffer, Rgba};

use instapick_core::{InstapickError, PickedObject, PickingMirror, PixelBuffer, Scene, ShadingOptions, SyncStats};

use crate::camera::Camera;
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::gpu_geometry::GeometryCache;
use crate::id_material::IdMaterialPipelines;
use crate::pick_target::PickTarget;
use crate::uniforms::{FrameUniforms, ObjectUniforms, SceneBindings};

/// Off-screen identifier renderer and decoder.
pub struct Picker {
    mirror: PickingMirror,
    bindings: SceneBindings,
    pipelines: IdMaterialPipelines,
    geometry: GeometryCache,
    target: Option<PickTarget>,
    pixels: PixelBuffer,
}

impl Picker {
    /// Creates a picker. The pick target is allocated on the first refresh.
    pub fn new(device: &wgpu::Device) -> Self {
        let bindings = SceneBindings::new(device, "instapick pick uniforms");
        let pipelines = IdMaterialPipelines::new(device, &bindings);
        Self {
            mirror: PickingMirror::new(),
            bindings,
            pipelines,
            geometry: GeometryCache::new(),
            target: None,
            pixels: PixelBuffer::new(),
        }
    }

    /// Reallocates the pick target and pixel buffer when the viewport size
    /// changed. Returns whether anything was reallocated.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> RenderResult<bool> {
        if self.target.as_ref().is_some_and(|t| t.size() == (width, height)) {
            return Ok(false);
        }
        let target = PickTarget::new(device, width, height)?;
        self.target = Some(target);
        self.pixels.resize(width, height);
        log::debug!("picker resized to {width}x{height}");
        Ok(true)
    }

    /// Synchronizes the mirror, renders it and reads back the pick buffer.
    ///
    /// `viewport` is the size of the visible render target; `camera` must be
    /// the camera the visible scene was drawn with. Blocks on the GPU.
    pub fn refresh(
        &mut self,
        gpu: &GpuContext,
        scene: &Scene,
        camera: &Camera,
        viewport: (u32, u32),
    ) -> RenderResult<SyncStats> {
        self.resize(&gpu.device, viewport.0, viewport.1)?;
        let stats = self.mirror.sync(scene);
        self.render(gpu, camera);

        let Some(target) = &self.target else {
            return Ok(stats);
        };
        if let Err(err) = target.read_back(&gpu.device, &gpu.queue, &mut self.pixels) {
            log::warn!("pick buffer readback failed: {err}");
            self.pixels.invalidate();
            return Err(err);
        }
        Ok(stats)
    }

    fn render(&mut self, gpu: &GpuContext, camera: &Camera) {
        let Self {
            mirror,
            bindings,
            pipelines,
            geometry,
            target,
            ..
        } = self;
        let Some(target) = target.as_ref() else {
            return;
        };

        let proxies: Vec<_> = mirror.proxies().collect();
        let mut records = Vec::with_capacity(proxies.len());
        for proxy in &proxies {
            geometry.prepare(&gpu.device, proxy.geometry());
            records.push(ObjectUniforms::pick(proxy.world_transform(), proxy.object_pick_id()));
        }
        geometry.end_pass();

        let frame = FrameUniforms::new(camera, &ShadingOptions::default());
        bindings.write(&gpu.device, &gpu.queue, &frame, &records);

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("instapick pick encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("instapick pick pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Background = id 0
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (index, proxy) in proxies.iter().enumerate() {
                let Some(mesh) = geometry.mesh(proxy.geometry()) else {
                    continue;
                };
                let Some(pipeline) = pipelines.get(proxy.material(), mesh.topology()) else {
                    continue;
                };
                let instances = geometry.instances(proxy.geometry());
                if proxy.geometry().is_instanced() && instances.is_none() {
                    continue;
                }
                pass.set_pipeline(pipeline);
                bindings.bind(&mut pass, index);
                mesh.draw(&mut pass, false, instances);
            }
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Decodes the object under a screen coordinate (origin top-left).
    ///
    /// Returns `None` before the first refresh, outside the viewport, over
    /// the background, or when the identifier matches no proxy.
    pub fn query(&self, x: i32, y: i32) -> Option<PickedObject> {
        let id = self.pixels.id_at(x, y).ok()??;
        self.mirror.resolve(id)
    }

    /// The raw identifier under a screen coordinate, if a buffer exists and
    /// the coordinate is inside it.
    pub fn id_at(&self, x: i32, y: i32) -> Option<u32> {
        self.pixels.id_at(x, y).ok().flatten()
    }

    /// The last read-back pixels.
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// The picking mirror as of the last refresh.
    pub fn mirror(&self) -> &PickingMirror {
        &self.mirror
    }

    /// Writes the last pick buffer to a PNG file, top row first.
    pub fn save_id_image(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        if !self.pixels.is_ready() {
            return Err(InstapickError::UnreadyBuffer.into());
        }
        let (width, height) = self.pixels.size();
        let data = self.pixels.to_top_down();
        let expected = data.len();
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, data).ok_or(RenderError::Core(InstapickError::SizeMismatch {
                attribute: "id image",
                expected: 4 * width as usize * height as usize,
                actual: expected,
            }))?;
        img.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
