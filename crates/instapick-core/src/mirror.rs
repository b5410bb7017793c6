//! Shadow scene of pick proxies.
//!
//! The mirror holds one [`PickProxy`] per drawable object of the real scene.
//! Each proxy shares its origin's geometry and is drawn with an identifier
//! material instead of the shaded one. [`PickingMirror::sync`] reconciles the
//! proxies with the scene once per refresh; [`PickingMirror::resolve`] turns a
//! decoded identifier back into the picked object.

use std::collections::{BTreeMap, HashSet};

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::geometry::SceneGeometry;
use crate::id::{ObjectId, BACKGROUND_ID};
use crate::material::IdMaterial;
use crate::scene::Scene;

/// Result of a pick: the object under the pointer and, for instance sets,
/// the index of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PickedObject {
    /// The scene object that was hit.
    pub object: ObjectId,
    /// Index of the hit instance when the object is an instance set.
    pub instance_index: Option<usize>,
}

/// Picking stand-in for one scene object.
#[derive(Debug, Clone)]
pub struct PickProxy {
    origin: ObjectId,
    geometry: SceneGeometry,
    material: IdMaterial,
    world_transform: Mat4,
}

impl PickProxy {
    fn new(origin: ObjectId, geometry: SceneGeometry, world_transform: Mat4) -> Self {
        geometry.ensure_id_attribute(origin.get());
        Self {
            origin,
            material: IdMaterial::for_geometry(&geometry),
            geometry,
            world_transform,
        }
    }

    /// Identifier of the scene object this proxy stands in for.
    pub fn origin(&self) -> ObjectId {
        self.origin
    }

    /// Geometry shared with the origin.
    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    /// Identifier material the proxy is drawn with.
    pub fn material(&self) -> IdMaterial {
        self.material
    }

    /// Origin's world transform as of the last sync.
    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    /// The scalar identifier a per-object material writes for this proxy.
    ///
    /// This is the geometry's attached pick id, which differs from the origin
    /// when several objects share one plain geometry.
    pub fn object_pick_id(&self) -> u32 {
        self.geometry.mesh().pick_id().unwrap_or(self.origin.get())
    }
}

/// Counters reported by one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Drawable objects seen in the scene.
    pub live: usize,
    /// Proxies created this pass.
    pub created: usize,
    /// Proxies whose geometry was replaced this pass.
    pub updated: usize,
    /// Proxies removed because their object left the scene.
    pub removed: usize,
}

/// The picking shadow scene.
#[derive(Debug, Default)]
pub struct PickingMirror {
    proxies: BTreeMap<ObjectId, PickProxy>,
}

impl PickingMirror {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciles the proxies with the drawable objects of `scene`.
    ///
    /// New objects get a proxy, objects whose geometry changed have it
    /// replaced in place, and proxies of objects no longer reached by the
    /// traversal are dropped. World transforms are refreshed for every live
    /// proxy.
    pub fn sync(&mut self, scene: &Scene) -> SyncStats {
        let mut stats = SyncStats::default();
        let mut live_ids = HashSet::new();

        scene.traverse(|object, world| {
            let Ok(geometry) = object.drawable_geometry() else {
                return;
            };
            let id = object.id();
            live_ids.insert(id);
            stats.live += 1;

            match self.proxies.get_mut(&id) {
                Some(proxy) => {
                    if !proxy.geometry.same_as(geometry) {
                        log::trace!("mirror: geometry of {id} replaced");
                        geometry.ensure_id_attribute(id.get());
                        proxy.geometry = geometry.clone();
                        proxy.material = IdMaterial::for_geometry(geometry);
                        stats.updated += 1;
                    }
                    proxy.world_transform = world;
                }
                None => {
                    log::trace!("mirror: proxy created for {id} '{}'", object.name);
                    self.proxies.insert(id, PickProxy::new(id, geometry.clone(), world));
                    stats.created += 1;
                }
            }
        });

        let before = self.proxies.len();
        self.proxies.retain(|id, _| live_ids.contains(id));
        stats.removed = before - self.proxies.len();

        log::debug!(
            "mirror sync: {} live, {} created, {} updated, {} removed",
            stats.live,
            stats.created,
            stats.updated,
            stats.removed
        );
        stats
    }

    /// Resolves a decoded identifier to the object (and instance) it belongs
    /// to. The background identifier and unknown identifiers yield `None`.
    pub fn resolve(&self, id: u32) -> Option<PickedObject> {
        if id == BACKGROUND_ID {
            return None;
        }
        self.proxies.values().find_map(|proxy| match &proxy.geometry {
            SceneGeometry::Instanced(set) => set.find_index_by_id(id).map(|index| PickedObject {
                object: proxy.origin,
                instance_index: Some(index),
            }),
            SceneGeometry::Plain(_) => (proxy.object_pick_id() == id).then_some(PickedObject {
                object: proxy.origin,
                instance_index: None,
            }),
        })
    }

    /// Returns the proxy for an object, if it has one.
    pub fn get(&self, id: ObjectId) -> Option<&PickProxy> {
        self.proxies.get(&id)
    }

    /// Iterates over the proxies in identifier order.
    pub fn proxies(&self) -> impl Iterator<Item = &PickProxy> {
        self.proxies.values()
    }

    /// Identifiers of all proxied objects, in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.proxies.keys().copied()
    }

    /// Number of proxies.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns true if the mirror has no proxies.
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Drops every proxy.
    pub fn clear(&mut self) {
        self.proxies.clear();
    }
}
