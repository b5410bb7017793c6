//! Base geometry and the geometry variants a scene object can draw.

use std::f32::consts::{PI, TAU};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{InstapickError, Result};
use crate::instance::InstancedGeometry;

static NEXT_GEOMETRY_UID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_geometry_uid() -> u64 {
    NEXT_GEOMETRY_UID.fetch_add(1, Ordering::Relaxed)
}

/// How the vertices of a geometry are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Topology {
    /// Every three indices form a triangle.
    #[default]
    Triangles,
    /// Every two indices form a line segment.
    Lines,
    /// Each index is a point.
    Points,
}

/// Vertex and index data for one shape.
///
/// Geometries are shared behind `Arc` by scene objects, instance sets and
/// picking proxies. The data is immutable after construction; the only
/// late addition is the scalar pick identifier attached the first time the
/// geometry is drawn by a per-object ID material.
#[derive(Debug)]
pub struct MeshGeometry {
    uid: u64,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    topology: Topology,
    pick_id: OnceLock<u32>,
}

impl MeshGeometry {
    /// Creates a geometry from raw vertex data.
    ///
    /// `normals` must be empty or match `positions` in length. An empty
    /// `indices` draws the vertices in order.
    pub fn new(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        indices: Vec<u32>,
        topology: Topology,
    ) -> Result<Self> {
        if !normals.is_empty() && normals.len() != positions.len() {
            return Err(InstapickError::SizeMismatch {
                attribute: "normal",
                expected: positions.len(),
                actual: normals.len(),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(InstapickError::InvalidGeometry(format!(
                "index {bad} past vertex count {}",
                positions.len()
            )));
        }
        let normals = if normals.is_empty() {
            vec![Vec3::ZERO; positions.len()]
        } else {
            normals
        };
        Ok(Self {
            uid: next_geometry_uid(),
            positions,
            normals,
            indices,
            topology,
            pick_id: OnceLock::new(),
        })
    }

    /// Axis-aligned box centered at the origin, with per-face normals.
    #[must_use]
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let h = Vec3::new(width, height, depth) * 0.5;
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, right) in faces {
            let base = positions.len() as u32;
            for (su, sr) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((normal + up * su + right * sr) * h);
                normals.push(normal);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::from_parts(positions, normals, indices, Topology::Triangles)
    }

    /// Latitude/longitude sphere centered at the origin.
    #[must_use]
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);

        let mut positions = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let normal = Vec3::new(
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                );
                positions.push(normal * radius);
                normals.push(normal);
            }
        }

        let mut indices = Vec::with_capacity((ws * hs * 6) as usize);
        let stride = ws + 1;
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * stride + ix + 1;
                let b = iy * stride + ix;
                let c = (iy + 1) * stride + ix;
                let d = (iy + 1) * stride + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::from_parts(positions, normals, indices, Topology::Triangles)
    }

    /// A point set drawn in vertex order.
    #[must_use]
    pub fn points(positions: Vec<Vec3>) -> Self {
        let normals = vec![Vec3::ZERO; positions.len()];
        Self::from_parts(positions, normals, Vec::new(), Topology::Points)
    }

    /// Disconnected line segments; each consecutive pair of positions is one
    /// segment.
    #[must_use]
    pub fn line_segments(positions: Vec<Vec3>) -> Self {
        let normals = vec![Vec3::ZERO; positions.len()];
        Self::from_parts(positions, normals, Vec::new(), Topology::Lines)
    }

    fn from_parts(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>, topology: Topology) -> Self {
        Self {
            uid: next_geometry_uid(),
            positions,
            normals,
            indices,
            topology,
            pick_id: OnceLock::new(),
        }
    }

    /// Unique identity of this geometry, used to key GPU uploads.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Vertex positions.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Vertex normals (zero for points and lines).
    #[must_use]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Primitive indices; empty when drawn in vertex order.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Primitive assembly mode.
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Number of vertices the draw call consumes.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        if self.indices.is_empty() {
            self.positions.len() as u32
        } else {
            self.indices.len() as u32
        }
    }

    /// The scalar pick identifier, if one has been attached.
    #[must_use]
    pub fn pick_id(&self) -> Option<u32> {
        self.pick_id.get().copied()
    }

    /// Attaches `id` as the pick identifier unless one is already present,
    /// and returns the identifier the geometry carries.
    ///
    /// A geometry shared by several objects keeps the identifier of the first
    /// object that attached one.
    pub fn ensure_pick_id(&self, id: u32) -> u32 {
        *self.pick_id.get_or_init(|| id)
    }

    /// Axis-aligned bounds of the vertex positions.
    #[must_use]
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), &p| (min.min(p), max.max(p))),
        )
    }
}

/// Geometry attached to a drawable scene object.
///
/// The variant is resolved once when a picking proxy is created and decides
/// which ID material renders it and how a decoded identifier is matched.
#[derive(Debug, Clone)]
pub enum SceneGeometry {
    /// One shape drawn once; identified by its object ID.
    Plain(Arc<MeshGeometry>),
    /// One blueprint drawn once per instance; identified per instance.
    Instanced(Arc<InstancedGeometry>),
}

impl SceneGeometry {
    /// Returns whether both values reference the same geometry object.
    #[must_use]
    pub fn same_as(&self, other: &SceneGeometry) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => Arc::ptr_eq(a, b),
            (Self::Instanced(a), Self::Instanced(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns the vertex data that is drawn (the blueprint for instance sets).
    #[must_use]
    pub fn mesh(&self) -> &MeshGeometry {
        match self {
            Self::Plain(mesh) => mesh,
            Self::Instanced(instanced) => instanced.blueprint(),
        }
    }

    /// Returns the instance set, if this is one.
    #[must_use]
    pub fn as_instanced(&self) -> Option<&Arc<InstancedGeometry>> {
        match self {
            Self::Plain(_) => None,
            Self::Instanced(instanced) => Some(instanced),
        }
    }

    /// Returns whether this geometry is an instance set.
    #[must_use]
    pub fn is_instanced(&self) -> bool {
        matches!(self, Self::Instanced(_))
    }

    /// Attaches the scalar pick identifier to plain geometries. Instance sets
    /// already carry one identifier per instance and are left untouched.
    pub fn ensure_id_attribute(&self, id: u32) {
        if let Self::Plain(mesh) = self {
            let carried = mesh.ensure_pick_id(id);
            if carried != id {
                log::trace!("geometry {} keeps pick id {carried} (requested {id})", mesh.uid());
            }
        }
    }
}

impl From<Arc<MeshGeometry>> for SceneGeometry {
    fn from(mesh: Arc<MeshGeometry>) -> Self {
        Self::Plain(mesh)
    }
}

impl From<MeshGeometry> for SceneGeometry {
    fn from(mesh: MeshGeometry) -> Self {
        Self::Plain(Arc::new(mesh))
    }
}

impl From<Arc<InstancedGeometry>> for SceneGeometry {
    fn from(instanced: Arc<InstancedGeometry>) -> Self {
        Self::Instanced(instanced)
    }
}

impl From<InstancedGeometry> for SceneGeometry {
    fn from(instanced: InstancedGeometry) -> Self {
        Self::Instanced(Arc::new(instanced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_shape() {
        let cube = MeshGeometry::cuboid(2.0, 2.0, 2.0);
        assert_eq!(cube.positions().len(), 24);
        assert_eq!(cube.indices().len(), 36);
        let (min, max) = cube.bounding_box().unwrap();
        assert_eq!(min, Vec3::splat(-1.0));
        assert_eq!(max, Vec3::splat(1.0));
    }

    #[test]
    fn test_cuboid_faces_wind_counter_clockwise() {
        let cube = MeshGeometry::cuboid(1.0, 2.0, 3.0);
        for tri in cube.indices().chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| cube.positions()[tri[k] as usize]);
            let face = (b - a).cross(c - a);
            assert!(face.dot(cube.normals()[tri[0] as usize]) > 0.0);
        }
    }

    #[test]
    fn test_uv_sphere_radius() {
        let sphere = MeshGeometry::uv_sphere(0.5, 16, 8);
        assert!(sphere
            .positions()
            .iter()
            .all(|p| (p.length() - 0.5).abs() < 1e-5));
        assert!(sphere.indices().iter().all(|&i| (i as usize) < sphere.positions().len()));
        assert_eq!(sphere.indices().len() % 3, 0);
    }

    #[test]
    fn test_new_validates_inputs() {
        let err = MeshGeometry::new(vec![Vec3::ZERO], vec![Vec3::Y, Vec3::Y], vec![], Topology::Points);
        assert!(matches!(err, Err(InstapickError::SizeMismatch { .. })));
        let err = MeshGeometry::new(vec![Vec3::ZERO], vec![], vec![0, 1, 0], Topology::Triangles);
        assert!(matches!(err, Err(InstapickError::InvalidGeometry(_))));
    }

    #[test]
    fn test_draw_count() {
        let lines = MeshGeometry::line_segments(vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        assert_eq!(lines.draw_count(), 4);
        assert_eq!(lines.topology(), Topology::Lines);
        assert_eq!(MeshGeometry::cuboid(1.0, 1.0, 1.0).draw_count(), 36);
    }

    #[test]
    fn test_pick_id_attached_once() {
        let mesh = MeshGeometry::cuboid(1.0, 1.0, 1.0);
        assert_eq!(mesh.pick_id(), None);
        assert_eq!(mesh.ensure_pick_id(7), 7);
        assert_eq!(mesh.ensure_pick_id(9), 7);
        assert_eq!(mesh.pick_id(), Some(7));
    }

    #[test]
    fn test_same_as_compares_identity() {
        let a: SceneGeometry = MeshGeometry::cuboid(1.0, 1.0, 1.0).into();
        let b: SceneGeometry = MeshGeometry::cuboid(1.0, 1.0, 1.0).into();
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_uids_are_unique() {
        let a = MeshGeometry::points(vec![Vec3::ZERO]);
        let b = MeshGeometry::points(vec![Vec3::ZERO]);
        assert_ne!(a.uid(), b.uid());
    }
}
