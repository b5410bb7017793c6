//! Mirror synchronization against random scene edits.
//!
//! These run without a GPU: they drive `PickingMirror::sync` directly and
//! compare the proxy set with what a traversal of the scene reaches.

use std::collections::BTreeSet;
use std::sync::Arc;

use instapick::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    AddMesh,
    AddInstanced(usize),
    AddChild(usize),
    Remove(usize),
    ToggleVisible(usize),
    SwapGeometry(usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => Just(Edit::AddMesh),
        1 => (1usize..6).prop_map(Edit::AddInstanced),
        2 => any::<usize>().prop_map(Edit::AddChild),
        2 => any::<usize>().prop_map(Edit::Remove),
        1 => any::<usize>().prop_map(Edit::ToggleVisible),
        1 => any::<usize>().prop_map(Edit::SwapGeometry),
    ]
}

fn drawable_ids(scene: &Scene) -> BTreeSet<ObjectId> {
    let mut ids = BTreeSet::new();
    scene.traverse(|object, _| {
        if object.drawable_geometry().is_ok() {
            ids.insert(object.id());
        }
    });
    ids
}

fn all_ids(scene: &Scene) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    let mut stack: Vec<ObjectId> = scene.roots().to_vec();
    while let Some(id) = stack.pop() {
        ids.push(id);
        if let Some(object) = scene.get(id) {
            stack.extend_from_slice(object.children());
        }
    }
    ids.sort();
    ids
}

fn apply(scene: &mut Scene, edit: &Edit, cube: &Arc<MeshGeometry>) {
    let ids = all_ids(scene);
    let pick = |n: usize| (!ids.is_empty()).then(|| ids[n % ids.len()]);
    match *edit {
        Edit::AddMesh => {
            scene.add(SceneObject::mesh("mesh", Arc::clone(cube), ShadingMaterial::default()));
        }
        Edit::AddInstanced(count) => {
            let positions = (0..count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
            if let Ok(set) = InstancedGeometry::from_positions(Arc::clone(cube), positions) {
                scene.add(SceneObject::mesh("set", set, ShadingMaterial::default()));
            }
        }
        Edit::AddChild(n) => {
            let child = SceneObject::mesh("child", MeshGeometry::cuboid(0.5, 0.5, 0.5), ShadingMaterial::default());
            match pick(n) {
                Some(parent) => {
                    scene.add_child(parent, child).expect("parent exists");
                }
                None => {
                    scene.add(child);
                }
            }
        }
        Edit::Remove(n) => {
            if let Some(id) = pick(n) {
                scene.remove(id);
            }
        }
        Edit::ToggleVisible(n) => {
            if let Some(object) = pick(n).and_then(|id| scene.get_mut(id)) {
                object.visible = !object.visible;
            }
        }
        Edit::SwapGeometry(n) => {
            if let Some(object) = pick(n).and_then(|id| scene.get_mut(id)) {
                object.set_geometry(MeshGeometry::uv_sphere(0.5, 8, 4));
            }
        }
    }
}

proptest! {
    #[test]
    fn mirror_converges_after_every_sync(edits in prop::collection::vec(edit_strategy(), 1..40)) {
        let cube = Arc::new(MeshGeometry::cuboid(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        let mut mirror = PickingMirror::new();

        for edit in &edits {
            apply(&mut scene, edit, &cube);
            let stats = mirror.sync(&scene);
            let expected = drawable_ids(&scene);
            let actual: BTreeSet<ObjectId> = mirror.ids().collect();
            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(stats.live, expected.len());
        }
    }

    #[test]
    fn resync_without_edits_is_idle(edits in prop::collection::vec(edit_strategy(), 1..20)) {
        let cube = Arc::new(MeshGeometry::cuboid(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        let mut mirror = PickingMirror::new();
        for edit in &edits {
            apply(&mut scene, edit, &cube);
        }
        mirror.sync(&scene);
        let stats = mirror.sync(&scene);
        prop_assert_eq!(stats.created, 0);
        prop_assert_eq!(stats.updated, 0);
        prop_assert_eq!(stats.removed, 0);
    }
}

#[test]
fn removed_objects_leave_no_stale_proxy() {
    let mut scene = Scene::new();
    let mut mirror = PickingMirror::new();

    let keep = scene.add(SceneObject::mesh("keep", MeshGeometry::cuboid(1.0, 1.0, 1.0), ShadingMaterial::default()));
    let group = scene.add(SceneObject::group("group"));
    let child = scene
        .add_child(group, SceneObject::mesh("child", MeshGeometry::cuboid(1.0, 1.0, 1.0), ShadingMaterial::default()))
        .unwrap();

    let stats = mirror.sync(&scene);
    assert_eq!(stats.created, 2);
    let child_pick = mirror.get(child).unwrap().object_pick_id();
    assert_eq!(mirror.resolve(child_pick).map(|p| p.object), Some(child));

    scene.remove(group);
    let stats = mirror.sync(&scene);
    assert_eq!(stats.removed, 1);
    assert!(mirror.get(child).is_none());
    assert!(mirror.resolve(child_pick).is_none());
    assert!(mirror.get(keep).is_some());
}

#[test]
fn instance_ids_resolve_through_mapped_sources() {
    let blueprint = Arc::new(MeshGeometry::uv_sphere(0.3, 8, 4));
    let names = vec!["a", "b", "c"];
    let markers = MappedInstances::from_sources(
        blueprint,
        names,
        &InstanceGenerators::new().position(|_: &&str| Vec3::ZERO),
    )
    .unwrap();

    let mut scene = Scene::new();
    let set = scene.add(SceneObject::mesh("markers", markers.scene_geometry(), ShadingMaterial::default()));
    let mut mirror = PickingMirror::new();
    mirror.sync(&scene);

    let id = markers.instance_id(2).unwrap();
    let picked = mirror.resolve(id).unwrap();
    assert_eq!(picked.object, set);
    assert_eq!(picked.instance_index, Some(2));
    assert_eq!(markers.find_source_by_index(2).unwrap(), &"c");
    assert_eq!(markers.find_source_by_id(id), Some(&"c"));
}
