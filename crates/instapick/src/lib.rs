//! instapick: GPU instancing and color-ID picking for retained-mode 3D scenes.
//!
//! Draw thousands of copies of one shape with per-instance transforms and
//! colors, and find out which object (and which instance) sits under the
//! pointer by rendering identifiers into an off-screen buffer.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use instapick::*;
//!
//! struct City { name: &'static str, location: Vec3 }
//!
//! let cities = vec![
//!     City { name: "north", location: Vec3::new(0.0, 1.0, 0.0) },
//!     City { name: "south", location: Vec3::new(0.0, -1.0, 0.0) },
//! ];
//! let markers = MappedInstances::from_sources(
//!     Arc::new(MeshGeometry::uv_sphere(0.1, 16, 8)),
//!     cities,
//!     &InstanceGenerators::new().position(|c: &City| c.location),
//! )?;
//!
//! let mut scene = Scene::new();
//! scene.add(SceneObject::mesh("cities", markers.scene_geometry(), ShadingMaterial::default()));
//!
//! let mut session = PickingSession::new_headless(800, 600, Options::default())?;
//! session.render_frame(&scene)?;
//! if let Some(PickedObject { instance_index: Some(i), .. }) = session.pick(400, 300) {
//!     println!("hovering {}", markers.find_source_by_index(i)?.name);
//! }
//! # Ok::<(), RenderError>(())
//! ```
//!
//! # Crates
//!
//! - `instapick-core`: identifiers, instance sets, scene graph, picking
//!   mirror, pixel decoding. No GPU.
//! - `instapick-render`: wgpu pipelines, pick target readback, [`Picker`].

mod session;

pub use session::PickingSession;

// Re-export core types
pub use instapick_core::{
    codec::{color_to_id, encode_id, id_to_color},
    error::{InstapickError, Result},
    geometry::{MeshGeometry, SceneGeometry, Topology},
    id::{ObjectId, BACKGROUND_ID, MAX_PICK_ID},
    instance::{InstanceAttributes, InstancedGeometry},
    mapped::{InstanceGenerators, MappedInstances},
    material::{IdMaterial, ShadingMaterial, ShadingModel},
    mirror::{PickProxy, PickedObject, PickingMirror, SyncStats},
    options::{FrameThrottle, Options, PickerOptions, ShadingOptions},
    pixels::PixelBuffer,
    scene::{Mesh, ObjectKind, Scene, SceneObject},
    Mat4, Quat, Vec3, Vec4,
};

// Re-export render types
pub use instapick_render::{Camera, GpuContext, Picker, ProjectionMode, RenderError, RenderResult, SceneRenderer};

/// Renders `scene` once into a headless pick buffer of the given size and
/// decodes one pointer position.
///
/// Creates a GPU context per call; keep a [`PickingSession`] around for
/// anything interactive.
pub fn pick_once(scene: &Scene, camera: &Camera, size: (u32, u32), x: i32, y: i32) -> RenderResult<Option<PickedObject>> {
    use pollster::FutureExt;

    let gpu = GpuContext::new_headless().block_on()?;
    let mut picker = Picker::new(&gpu.device);
    let stats = picker.refresh(&gpu, scene, camera, size)?;
    log::debug!("pick_once: {} proxies", stats.live);
    Ok(picker.query(x, y))
}
