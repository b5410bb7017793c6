//! Material descriptions for the shaded scene and the picking mirror.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::SceneGeometry;

/// Lighting model of a shaded material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShadingModel {
    /// Ambient, diffuse and specular terms from one directional light.
    #[default]
    Phong,
    /// Unlit flat color.
    Basic,
}

/// Appearance of a drawable object in the visible scene.
///
/// For instance sets the material color is multiplied by each instance's
/// color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingMaterial {
    /// Lighting model.
    pub model: ShadingModel,
    /// Base color.
    pub color: Vec3,
    /// Color added after lighting.
    pub emissive: Vec3,
    /// Alpha; values below 1 enable blending.
    pub opacity: f32,
    /// Use face normals derived from screen-space derivatives.
    pub flat_shading: bool,
    /// Specular exponent for Phong.
    pub shininess: f32,
}

impl Default for ShadingMaterial {
    fn default() -> Self {
        Self {
            model: ShadingModel::Phong,
            color: Vec3::ONE,
            emissive: Vec3::ZERO,
            opacity: 1.0,
            flat_shading: false,
            shininess: 30.0,
        }
    }
}

impl ShadingMaterial {
    /// A lit material of the given color.
    #[must_use]
    pub fn phong(color: Vec3) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// An unlit material of the given color.
    #[must_use]
    pub fn basic(color: Vec3) -> Self {
        Self {
            model: ShadingModel::Basic,
            color,
            ..Self::default()
        }
    }

    /// Sets the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Sets the emissive color.
    #[must_use]
    pub fn with_emissive(mut self, emissive: Vec3) -> Self {
        self.emissive = emissive;
        self
    }

    /// Enables or disables flat shading.
    #[must_use]
    pub fn with_flat_shading(mut self, flat: bool) -> Self {
        self.flat_shading = flat;
        self
    }

    /// Returns whether the material needs alpha blending.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// The identifier-encoding material a picking proxy is drawn with.
///
/// Neither variant runs lighting; both write the identifier as a base-255
/// color (see [`crate::codec`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdMaterial {
    /// One identifier for the whole object, read from the geometry's pick id.
    PerObject,
    /// One identifier per instance, read from the instance attributes.
    PerInstance,
}

impl IdMaterial {
    /// Selects the variant for a geometry.
    #[must_use]
    pub fn for_geometry(geometry: &SceneGeometry) -> Self {
        if geometry.is_instanced() {
            Self::PerInstance
        } else {
            Self::PerObject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshGeometry;
    use crate::instance::InstancedGeometry;
    use std::sync::Arc;

    #[test]
    fn test_id_material_follows_geometry_variant() {
        let mesh = Arc::new(MeshGeometry::cuboid(1.0, 1.0, 1.0));
        let plain = SceneGeometry::Plain(Arc::clone(&mesh));
        let instanced: SceneGeometry = InstancedGeometry::from_positions(mesh, vec![Vec3::ZERO; 2])
            .unwrap()
            .into();
        assert_eq!(IdMaterial::for_geometry(&plain), IdMaterial::PerObject);
        assert_eq!(IdMaterial::for_geometry(&instanced), IdMaterial::PerInstance);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let m = ShadingMaterial::basic(Vec3::X).with_opacity(1.5);
        assert_eq!(m.opacity, 1.0);
        assert!(!m.is_transparent());
        assert!(ShadingMaterial::phong(Vec3::X).with_opacity(0.4).is_transparent());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let m: ShadingMaterial = serde_json::from_str(r#"{"model":"Basic","opacity":0.5}"#).unwrap();
        assert_eq!(m.model, ShadingModel::Basic);
        assert_eq!(m.color, Vec3::ONE);
        assert_eq!(m.opacity, 0.5);
    }
}
