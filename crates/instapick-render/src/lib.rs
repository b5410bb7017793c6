//! wgpu backend for instapick.
//!
//! This crate renders the picking mirror with identifier-encoding materials,
//! reads the pick target back to the CPU and decodes pointer positions:
//! - [`Picker`] for refresh and query
//! - [`IdMaterialPipelines`] for the per-object and per-instance ID materials
//! - [`SceneRenderer`] for shaded, instanced rendering of the visible scene
//! - [`GpuContext`] for headless device creation

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// GPU data structures follow shader field names
#![allow(clippy::struct_field_names)]
// Texture sizes are u32 and buffer lengths usize
#![allow(clippy::cast_possible_truncation)]

pub mod buffer;
pub mod camera;
pub mod context;
pub mod error;
pub mod gpu_geometry;
pub mod id_material;
pub mod pick_target;
pub mod picker;
pub mod shading;
pub mod uniforms;

pub use camera::{Camera, ProjectionMode};
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use gpu_geometry::GeometryCache;
pub use id_material::{IdMaterialPipelines, PICK_COLOR_FORMAT, PICK_DEPTH_FORMAT};
pub use pick_target::{aligned_bytes_per_row, PickTarget};
pub use picker::Picker;
pub use shading::{SceneRenderer, ShadingPipelines, SCENE_COLOR_FORMAT};
pub use uniforms::{FrameUniforms, ObjectUniforms, SceneBindings};
