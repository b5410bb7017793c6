//! Instance sets bound to application entities.
//!
//! [`MappedInstances`] pairs an [`InstancedGeometry`] with the list of source
//! records it was generated from, so a picked instance index resolves back to
//! the domain object rather than raw geometry.

use std::ops::Deref;
use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::error::{InstapickError, Result};
use crate::geometry::{MeshGeometry, SceneGeometry};
use crate::instance::{InstanceAttributes, InstancedGeometry};

type Generator<T, V> = Box<dyn Fn(&T) -> V>;

/// Optional functions deriving instance attributes from a source record.
/// A missing generator leaves that attribute at its default.
pub struct InstanceGenerators<T> {
    position: Option<Generator<T, Vec3>>,
    orientation: Option<Generator<T, Quat>>,
    scale: Option<Generator<T, Vec3>>,
    color: Option<Generator<T, Vec3>>,
}

impl<T> Default for InstanceGenerators<T> {
    fn default() -> Self {
        Self {
            position: None,
            orientation: None,
            scale: None,
            color: None,
        }
    }
}

impl<T> InstanceGenerators<T> {
    /// Creates a set of generators that leaves every attribute at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the position generator.
    #[must_use]
    pub fn position(mut self, f: impl Fn(&T) -> Vec3 + 'static) -> Self {
        self.position = Some(Box::new(f));
        self
    }

    /// Sets the orientation generator.
    #[must_use]
    pub fn orientation(mut self, f: impl Fn(&T) -> Quat + 'static) -> Self {
        self.orientation = Some(Box::new(f));
        self
    }

    /// Sets the scale generator.
    #[must_use]
    pub fn scale(mut self, f: impl Fn(&T) -> Vec3 + 'static) -> Self {
        self.scale = Some(Box::new(f));
        self
    }

    /// Sets the color generator.
    #[must_use]
    pub fn color(mut self, f: impl Fn(&T) -> Vec3 + 'static) -> Self {
        self.color = Some(Box::new(f));
        self
    }

    fn generate(&self, sources: &[T]) -> InstanceAttributes {
        fn apply<T, V>(sources: &[T], f: Option<&Generator<T, V>>) -> Option<Vec<V>> {
            f.map(|f| sources.iter().map(f).collect())
        }
        InstanceAttributes {
            positions: apply(sources, self.position.as_ref()),
            orientations: apply(sources, self.orientation.as_ref()),
            scales: apply(sources, self.scale.as_ref()),
            colors: apply(sources, self.color.as_ref()),
        }
    }
}

/// An instance set whose instances map one-to-one onto source records.
#[derive(Debug)]
pub struct MappedInstances<T> {
    geometry: Arc<InstancedGeometry>,
    index_to_source: Vec<T>,
}

impl<T> MappedInstances<T> {
    /// Builds one instance per source record, deriving attributes with
    /// `generators`.
    pub fn from_sources(
        blueprint: Arc<MeshGeometry>,
        sources: Vec<T>,
        generators: &InstanceGenerators<T>,
    ) -> Result<Self> {
        let attributes = generators.generate(&sources);
        let geometry = InstancedGeometry::new(blueprint, sources.len(), attributes)?;
        Ok(Self {
            geometry: Arc::new(geometry),
            index_to_source: sources,
        })
    }

    /// The underlying instance set, shareable with scene objects.
    #[must_use]
    pub fn geometry(&self) -> &Arc<InstancedGeometry> {
        &self.geometry
    }

    /// Returns the geometry as a scene geometry for attaching to a mesh.
    #[must_use]
    pub fn scene_geometry(&self) -> SceneGeometry {
        SceneGeometry::Instanced(Arc::clone(&self.geometry))
    }

    /// All source records, in instance order.
    #[must_use]
    pub fn sources(&self) -> &[T] {
        &self.index_to_source
    }

    /// Returns the source record of the instance at `index`.
    pub fn find_source_by_index(&self, index: usize) -> Result<&T> {
        self.index_to_source
            .get(index)
            .ok_or(InstapickError::OutOfRange {
                index,
                count: self.index_to_source.len(),
            })
    }

    /// Returns the source record of the instance with identifier `id`.
    #[must_use]
    pub fn find_source_by_id(&self, id: u32) -> Option<&T> {
        let index = self.geometry.find_index_by_id(id)?;
        self.index_to_source.get(index)
    }
}

impl<T> Deref for MappedInstances<T> {
    type Target = InstancedGeometry;

    fn deref(&self) -> &Self::Target {
        &self.geometry
    }
}
