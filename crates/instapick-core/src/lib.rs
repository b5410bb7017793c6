//! Core data model for instapick.
//!
//! This crate holds everything about instancing and color-ID picking that does
//! not need a GPU:
//! - [`InstancedGeometry`] and [`MappedInstances`] for per-instance attributes
//!   and identifier lookup
//! - the identifier counter and the base-255 color codec
//! - the [`Scene`] graph and the [`PickingMirror`] that shadows it
//! - the [`PixelBuffer`] that decodes screen coordinates to identifiers
//! - configuration options

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Mesh generation works in u32 vertex indices and f32 parameters
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod codec;
pub mod error;
pub mod geometry;
pub mod id;
pub mod instance;
pub mod mapped;
pub mod material;
pub mod mirror;
pub mod options;
pub mod pixels;
pub mod scene;

pub use codec::{color_to_id, encode_id, id_to_color};
pub use error::{InstapickError, Result};
pub use geometry::{MeshGeometry, SceneGeometry, Topology};
pub use id::{next_ids, ObjectId, BACKGROUND_ID, MAX_PICK_ID};
pub use instance::{InstanceAttributes, InstanceRaw, InstancedGeometry};
pub use mapped::{InstanceGenerators, MappedInstances};
pub use material::{IdMaterial, ShadingMaterial, ShadingModel};
pub use mirror::{PickProxy, PickedObject, PickingMirror, SyncStats};
pub use options::{FrameThrottle, Options, PickerOptions, ShadingOptions};
pub use pixels::{PixelBuffer, BYTES_PER_PIXEL};
pub use scene::{Mesh, ObjectKind, Scene, SceneObject};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec3, Vec4};
