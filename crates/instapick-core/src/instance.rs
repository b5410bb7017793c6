//! Instance sets: one blueprint geometry drawn many times.
//!
//! Every instance gets its own identifier from the global counter at
//! construction. The set is fixed-size; the id → index map is built once and
//! never reconciled afterwards. To change instance data, build a new set.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::error::{InstapickError, Result};
use crate::geometry::{next_geometry_uid, MeshGeometry};
use crate::id;

/// Optional per-instance attribute arrays. Missing arrays take defaults:
/// origin, identity rotation, unit scale, white.
#[derive(Debug, Clone, Default)]
pub struct InstanceAttributes {
    /// Instance translations.
    pub positions: Option<Vec<Vec3>>,
    /// Instance rotations.
    pub orientations: Option<Vec<Quat>>,
    /// Instance scale factors per axis.
    pub scales: Option<Vec<Vec3>>,
    /// Instance RGB colors; alpha is always 1.
    pub colors: Option<Vec<Vec3>>,
}

/// Per-instance vertex data as uploaded to the GPU (64 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct InstanceRaw {
    /// Translation.
    pub position: [f32; 3],
    /// Pick identifier of this instance.
    pub pick_id: u32,
    /// Rotation quaternion (x, y, z, w).
    pub orientation: [f32; 4],
    /// Scale per axis.
    pub scale: [f32; 3],
    /// Padding to keep `color` 16-byte aligned.
    pub _padding: f32,
    /// RGBA color.
    pub color: [f32; 4],
}

/// A fixed-size set of instances sharing one blueprint geometry.
#[derive(Debug)]
pub struct InstancedGeometry {
    uid: u64,
    blueprint: Arc<MeshGeometry>,
    instance_ids: Vec<u32>,
    positions: Vec<Vec3>,
    orientations: Vec<Quat>,
    scales: Vec<Vec3>,
    colors: Vec<Vec3>,
    id_to_index: HashMap<u32, usize>,
}

fn check_len<T>(attribute: &'static str, data: Option<Vec<T>>, count: usize, default: T) -> Result<Vec<T>>
where
    T: Clone,
{
    match data {
        Some(values) if values.len() != count => Err(InstapickError::SizeMismatch {
            attribute,
            expected: count,
            actual: values.len(),
        }),
        Some(values) => Ok(values),
        None => Ok(vec![default; count]),
    }
}

impl InstancedGeometry {
    /// Creates an instance set of `count` instances of `blueprint`.
    ///
    /// Returns [`InstapickError::SizeMismatch`] if a supplied attribute array
    /// does not hold exactly `count` entries, and
    /// [`InstapickError::TooManyInstances`] if `count` does not fit in `u32`.
    pub fn new(blueprint: Arc<MeshGeometry>, count: usize, attributes: InstanceAttributes) -> Result<Self> {
        let block = u32::try_from(count).map_err(|_| InstapickError::TooManyInstances { count })?;
        let positions = check_len("instance position", attributes.positions, count, Vec3::ZERO)?;
        let orientations = check_len("instance orientation", attributes.orientations, count, Quat::IDENTITY)?;
        let scales = check_len("instance scale", attributes.scales, count, Vec3::ONE)?;
        let colors = check_len("instance color", attributes.colors, count, Vec3::ONE)?;

        let instance_ids: Vec<u32> = id::next_ids(block).collect();
        let id_to_index = instance_ids
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();

        Ok(Self {
            uid: next_geometry_uid(),
            blueprint,
            instance_ids,
            positions,
            orientations,
            scales,
            colors,
            id_to_index,
        })
    }

    /// Creates an instance set with only positions given.
    pub fn from_positions(blueprint: Arc<MeshGeometry>, positions: Vec<Vec3>) -> Result<Self> {
        let count = positions.len();
        Self::new(
            blueprint,
            count,
            InstanceAttributes {
                positions: Some(positions),
                ..InstanceAttributes::default()
            },
        )
    }

    /// Unique identity of this instance set, used to key GPU uploads.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// The shared base geometry.
    #[must_use]
    pub fn blueprint(&self) -> &Arc<MeshGeometry> {
        &self.blueprint
    }

    /// Number of instances.
    #[must_use]
    pub fn count(&self) -> usize {
        self.instance_ids.len()
    }

    /// Returns true if the set has no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instance_ids.is_empty()
    }

    /// Identifiers of all instances, in index order.
    #[must_use]
    pub fn instance_ids(&self) -> &[u32] {
        &self.instance_ids
    }

    /// Instance translations.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Instance rotations.
    #[must_use]
    pub fn orientations(&self) -> &[Quat] {
        &self.orientations
    }

    /// Instance scales.
    #[must_use]
    pub fn scales(&self) -> &[Vec3] {
        &self.scales
    }

    /// Instance colors.
    #[must_use]
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.count() {
            Ok(())
        } else {
            Err(InstapickError::OutOfRange {
                index,
                count: self.count(),
            })
        }
    }

    /// Returns the identifier of the instance at `index`.
    pub fn instance_id(&self, index: usize) -> Result<u32> {
        self.check_index(index)?;
        Ok(self.instance_ids[index])
    }

    /// Returns the translation of the instance at `index`.
    pub fn instance_position(&self, index: usize) -> Result<Vec3> {
        self.check_index(index)?;
        Ok(self.positions[index])
    }

    /// Returns the local transform (scale, then rotation, then translation)
    /// of the instance at `index`.
    pub fn instance_transform(&self, index: usize) -> Result<Mat4> {
        self.check_index(index)?;
        Ok(Mat4::from_scale_rotation_translation(
            self.scales[index],
            self.orientations[index],
            self.positions[index],
        ))
    }

    /// Looks up the index of the instance with identifier `id`.
    #[must_use]
    pub fn find_index_by_id(&self, id: u32) -> Option<usize> {
        self.id_to_index.get(&id).copied()
    }

    /// Packs the instance attributes for upload.
    #[must_use]
    pub fn to_raw(&self) -> Vec<InstanceRaw> {
        (0..self.count())
            .map(|i| InstanceRaw {
                position: self.positions[i].to_array(),
                pick_id: self.instance_ids[i],
                orientation: self.orientations[i].to_array(),
                scale: self.scales[i].to_array(),
                _padding: 0.0,
                color: self.colors[i].extend(1.0).to_array(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn blueprint() -> Arc<MeshGeometry> {
        Arc::new(MeshGeometry::uv_sphere(0.5, 8, 6))
    }

    #[test]
    fn test_defaults() {
        let set = InstancedGeometry::new(blueprint(), 3, InstanceAttributes::default()).unwrap();
        assert_eq!(set.count(), 3);
        assert!(set.positions().iter().all(|&p| p == Vec3::ZERO));
        assert!(set.orientations().iter().all(|&q| q == Quat::IDENTITY));
        assert!(set.scales().iter().all(|&s| s == Vec3::ONE));
        assert!(set.colors().iter().all(|&c| c == Vec3::ONE));
        assert!(set.to_raw().iter().all(|raw| raw.color == [1.0; 4]));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let err = InstancedGeometry::new(
            blueprint(),
            3,
            InstanceAttributes {
                scales: Some(vec![Vec3::ONE; 2]),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InstapickError::SizeMismatch {
                attribute: "instance scale",
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_ids_unique_and_disjoint_from_objects() {
        let before = ObjectId::next();
        let a = InstancedGeometry::new(blueprint(), 100, InstanceAttributes::default()).unwrap();
        let b = InstancedGeometry::new(blueprint(), 50, InstanceAttributes::default()).unwrap();
        let after = ObjectId::next();

        let ids: HashSet<u32> = a.instance_ids().iter().chain(b.instance_ids()).copied().collect();
        assert_eq!(ids.len(), 150);
        assert!(!ids.contains(&before.get()));
        assert!(!ids.contains(&after.get()));
        assert!(ids.iter().all(|&id| id > before.get() && id < after.get()));
    }

    #[test]
    fn test_ids_are_sequential_within_a_set() {
        let set = InstancedGeometry::new(blueprint(), 5, InstanceAttributes::default()).unwrap();
        let ids = set.instance_ids();
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_position_lookup_and_out_of_range() {
        let positions = vec![Vec3::X, Vec3::Y, Vec3::Z];
        let set = InstancedGeometry::from_positions(blueprint(), positions).unwrap();
        assert_eq!(set.instance_position(1).unwrap(), Vec3::Y);
        assert!(matches!(
            set.instance_position(3),
            Err(InstapickError::OutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_unknown_id_has_no_index() {
        let set = InstancedGeometry::new(blueprint(), 2, InstanceAttributes::default()).unwrap();
        assert_eq!(set.find_index_by_id(0), None);
        assert_eq!(set.find_index_by_id(set.instance_ids()[1] + 1), None);
    }

    #[test]
    fn test_instance_transform_applies_trs() {
        let set = InstancedGeometry::new(
            blueprint(),
            1,
            InstanceAttributes {
                positions: Some(vec![Vec3::new(1.0, 2.0, 3.0)]),
                orientations: Some(vec![Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)]),
                scales: Some(vec![Vec3::splat(2.0)]),
                colors: None,
            },
        )
        .unwrap();
        let p = set.instance_transform(0).unwrap().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_count_beyond_u32_is_rejected() {
        let count = u32::MAX as usize + 1;
        let err = InstancedGeometry::new(blueprint(), count, InstanceAttributes::default()).unwrap_err();
        assert!(matches!(err, InstapickError::TooManyInstances { count: c } if c == count));
        assert!(err.to_string().contains("32-bit"));
    }

    #[test]
    fn test_raw_layout_size() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
    }

    proptest! {
        #[test]
        fn prop_lookup_is_bijective(count in 0usize..300) {
            let set = InstancedGeometry::new(blueprint(), count, InstanceAttributes::default()).unwrap();
            for (i, &id) in set.instance_ids().iter().enumerate() {
                prop_assert_eq!(set.find_index_by_id(id), Some(i));
            }
        }
    }
}
