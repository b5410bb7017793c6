//! Retained-mode scene graph observed by the picking mirror.
//!
//! Objects are owned by the [`Scene`] and refer to their children by
//! identifier. Traversal is depth-first in insertion order and accumulates
//! world transforms along the way.

use std::collections::HashMap;

use glam::Mat4;

use crate::error::{InstapickError, Result};
use crate::geometry::SceneGeometry;
use crate::id::ObjectId;
use crate::material::ShadingMaterial;

/// Drawable content of a scene object.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Geometry drawn by this object; may be shared with other objects.
    pub geometry: SceneGeometry,
    /// Appearance in the visible scene.
    pub material: ShadingMaterial,
}

/// What a scene object is.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// A transform node with no geometry of its own.
    Group,
    /// A drawable object.
    Mesh(Mesh),
}

/// A node of the scene graph.
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    /// Display name, not required to be unique.
    pub name: String,
    /// Transform relative to the parent.
    pub transform: Mat4,
    /// Invisible objects and their descendants are skipped by traversal.
    pub visible: bool,
    /// Group or drawable.
    pub kind: ObjectKind,
    children: Vec<ObjectId>,
    parent: Option<ObjectId>,
}

impl SceneObject {
    fn with_kind(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.into(),
            transform: Mat4::IDENTITY,
            visible: true,
            kind,
            children: Vec::new(),
            parent: None,
        }
    }

    /// Creates an empty group node.
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(name, ObjectKind::Group)
    }

    /// Creates a drawable object.
    pub fn mesh(name: impl Into<String>, geometry: impl Into<SceneGeometry>, material: ShadingMaterial) -> Self {
        Self::with_kind(
            name,
            ObjectKind::Mesh(Mesh {
                geometry: geometry.into(),
                material,
            }),
        )
    }

    /// Sets the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the visibility flag.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// The object's identifier, allocated at construction.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Identifiers of the direct children, in insertion order.
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Identifier of the parent, or `None` for roots.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Returns the geometry this object draws.
    ///
    /// Groups have none and yield [`InstapickError::UnsupportedGeometry`].
    pub fn drawable_geometry(&self) -> Result<&SceneGeometry> {
        match &self.kind {
            ObjectKind::Mesh(mesh) => Ok(&mesh.geometry),
            ObjectKind::Group => Err(InstapickError::UnsupportedGeometry(self.id)),
        }
    }

    /// Replaces the geometry of a drawable object. Returns `false` for groups.
    pub fn set_geometry(&mut self, geometry: impl Into<SceneGeometry>) -> bool {
        match &mut self.kind {
            ObjectKind::Mesh(mesh) => {
                mesh.geometry = geometry.into();
                true
            }
            ObjectKind::Group => false,
        }
    }
}

/// The scene graph.
#[derive(Debug, Default)]
pub struct Scene {
    objects: HashMap<ObjectId, SceneObject>,
    roots: Vec<ObjectId>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object at the top level and returns its identifier.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.roots.push(id);
        self.insert(object, None);
        id
    }

    /// Adds an object under `parent`.
    pub fn add_child(&mut self, parent: ObjectId, object: SceneObject) -> Result<ObjectId> {
        let id = object.id;
        let parent_node = self
            .objects
            .get_mut(&parent)
            .ok_or(InstapickError::UnknownObject(parent))?;
        parent_node.children.push(id);
        self.insert(object, Some(parent));
        Ok(id)
    }

    fn insert(&mut self, mut object: SceneObject, parent: Option<ObjectId>) {
        object.parent = parent;
        log::trace!("scene: added {} '{}'", object.id, object.name);
        self.objects.insert(object.id, object);
    }

    /// Removes an object together with its descendants. Returns the removed
    /// object itself.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let object = self.objects.remove(&id)?;
        match object.parent {
            Some(parent) => {
                if let Some(p) = self.objects.get_mut(&parent) {
                    p.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }

        let mut pending = object.children.clone();
        while let Some(child) = pending.pop() {
            if let Some(removed) = self.objects.remove(&child) {
                pending.extend(removed.children);
            }
        }
        Some(object)
    }

    /// Gets an object by identifier.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Gets a mutable reference to an object by identifier.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// Number of objects in the scene, including groups.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Top-level objects, in insertion order.
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Visits every visible object depth-first in insertion order, passing
    /// its world transform.
    pub fn traverse(&self, mut visit: impl FnMut(&SceneObject, Mat4)) {
        let mut stack: Vec<(ObjectId, Mat4)> = self.roots.iter().rev().map(|&id| (id, Mat4::IDENTITY)).collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(object) = self.objects.get(&id) else {
                continue;
            };
            if !object.visible {
                continue;
            }
            let world = parent_world * object.transform;
            visit(object, world);
            stack.extend(object.children.iter().rev().map(|&c| (c, world)));
        }
    }
}
