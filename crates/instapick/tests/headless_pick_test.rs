//! Headless picking integration tests.
//!
//! These need a GPU adapter (real or software fallback). Without one each
//! test prints a notice and returns early.

use std::sync::Arc;

use instapick::*;

fn gpu_or_skip() -> Option<GpuContext> {
    match GpuContext::new_headless_blocking() {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("Skipping headless pick test: no GPU adapter available ({e})");
            None
        }
    }
}

/// Projects a world point to top-down pixel coordinates.
fn project(camera: &Camera, point: Vec3, width: u32, height: u32) -> (i32, i32) {
    let clip = camera.view_projection_matrix() * point.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    let x = (ndc.x * 0.5 + 0.5) * width as f32;
    let y = (0.5 - ndc.y * 0.5) * height as f32;
    (x as i32, y as i32)
}

#[test]
fn headless_lone_cube_is_picked_at_center() {
    let Some(gpu) = gpu_or_skip() else { return };
    let mut scene = Scene::new();
    let cube = scene.add(SceneObject::mesh(
        "cube",
        MeshGeometry::cuboid(1.0, 1.0, 1.0),
        ShadingMaterial::default(),
    ));

    let mut session = PickingSession::with_context(gpu, 64, 64, Options::default()).expect("session");
    assert_eq!(session.pick(32, 32), None, "no pick buffer before the first refresh");
    assert!(session.render_frame(&scene).expect("frame"), "first frame refreshes");

    let picked = session.pick(32, 32).expect("cube under center");
    assert_eq!(picked.object, cube);
    assert_eq!(picked.instance_index, None);

    assert_eq!(session.pick(0, 0), None);
    assert_eq!(session.pick(63, 63), None);
    assert_eq!(session.pick(-1, 10), None);
    assert_eq!(session.pick(64, 10), None);
}

#[test]
fn headless_instances_resolve_to_their_index() {
    let Some(gpu) = gpu_or_skip() else { return };
    let blueprint = Arc::new(MeshGeometry::uv_sphere(0.3, 16, 8));
    let centers: Vec<Vec3> = (-2..=2).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let spheres = InstancedGeometry::from_positions(blueprint, centers.clone()).expect("instances");

    let mut scene = Scene::new();
    let set = scene.add(SceneObject::mesh("spheres", spheres, ShadingMaterial::default()));

    let mut session = PickingSession::with_context(gpu, 128, 128, Options::default()).expect("session");
    session.camera_mut().position = Vec3::new(0.0, 0.0, 6.0);
    session.render_frame(&scene).expect("frame");

    for (index, center) in centers.iter().enumerate() {
        let (x, y) = project(session.camera(), *center, 128, 128);
        let picked = session.pick(x, y).expect("sphere under its projected center");
        assert_eq!(picked.object, set);
        assert_eq!(picked.instance_index, Some(index));
    }

    // Between two spheres only background
    let (x, y) = project(session.camera(), Vec3::new(0.5, 0.0, 0.0), 128, 128);
    assert_eq!(session.pick(x, y), None);
}

#[test]
fn headless_nested_transform_is_honored() {
    let Some(gpu) = gpu_or_skip() else { return };
    let mut scene = Scene::new();
    let group = scene.add(SceneObject::group("offset").with_transform(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))));
    let child = scene
        .add_child(
            group,
            SceneObject::mesh("cube", MeshGeometry::cuboid(0.5, 0.5, 0.5), ShadingMaterial::default()),
        )
        .expect("child");

    let mut session = PickingSession::with_context(gpu, 96, 96, Options::default()).expect("session");
    session.refresh_picker(&scene).expect("refresh");

    let (x, y) = project(session.camera(), Vec3::new(1.0, 0.0, 0.0), 96, 96);
    assert_eq!(session.pick(x, y).map(|p| p.object), Some(child));
    let (x, y) = project(session.camera(), Vec3::ZERO, 96, 96);
    assert_eq!(session.pick(x, y), None);
}

#[test]
fn headless_throttle_and_disable() {
    let Some(gpu) = gpu_or_skip() else { return };
    let mut scene = Scene::new();
    scene.add(SceneObject::mesh("cube", MeshGeometry::cuboid(1.0, 1.0, 1.0), ShadingMaterial::default()));

    let options = Options::from_json_str(r#"{ "picker": { "refresh_interval": 3 } }"#).expect("options");
    let mut session = PickingSession::with_context(gpu, 32, 32, options).expect("session");

    let refreshed: Vec<bool> = (0..6).map(|_| session.render_frame(&scene).expect("frame")).collect();
    assert_eq!(refreshed, vec![true, false, false, true, false, false]);
    assert!(session.pick(16, 16).is_some());

    session.set_picking_enabled(false);
    assert_eq!(session.pick(16, 16), None);
    let refreshed: Vec<bool> = (0..3).map(|_| session.render_frame(&scene).expect("frame")).collect();
    assert_eq!(refreshed, vec![false, false, false]);
}

#[test]
fn headless_resize_reallocates_pick_buffer() {
    let Some(gpu) = gpu_or_skip() else { return };
    let mut scene = Scene::new();
    scene.add(SceneObject::mesh("cube", MeshGeometry::cuboid(1.0, 1.0, 1.0), ShadingMaterial::default()));

    let mut session = PickingSession::with_context(gpu, 40, 30, Options::default()).expect("session");
    session.refresh_picker(&scene).expect("refresh");
    assert_eq!(session.picker().pixels().as_bytes().len(), 4 * 40 * 30);

    session.resize(70, 50).expect("resize");
    assert_eq!(session.size(), (70, 50));
    session.refresh_picker(&scene).expect("refresh");
    assert_eq!(session.picker().pixels().size(), (70, 50));
    assert_eq!(session.picker().pixels().as_bytes().len(), 4 * 70 * 50);
    assert!(session.pick(35, 25).is_some());

    assert!(matches!(session.resize(0, 10), Err(RenderError::InvalidViewport { .. })));
}

#[test]
fn headless_shaded_frame_and_id_dump() {
    let Some(gpu) = gpu_or_skip() else { return };
    let mut scene = Scene::new();
    scene.add(SceneObject::mesh(
        "cube",
        MeshGeometry::cuboid(1.0, 1.0, 1.0),
        ShadingMaterial::phong(Vec3::new(0.8, 0.2, 0.2)),
    ));
    scene.add(SceneObject::mesh(
        "glass",
        MeshGeometry::uv_sphere(0.4, 16, 8),
        ShadingMaterial::basic(Vec3::new(0.2, 0.4, 0.9)).with_opacity(0.5),
    ));

    let mut session = PickingSession::with_context(gpu, 48, 48, Options::default()).expect("session");
    session.render_frame(&scene).expect("frame");

    let pixels = session.capture().expect("capture");
    assert_eq!(pixels.len(), 48 * 48 * 4);
    let first = &pixels[0..4];
    assert!(pixels.chunks(4).any(|px| px != first), "frame should not be uniform");

    let dir = std::env::temp_dir().join(format!("instapick-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("ids.png");
    session.picker().save_id_image(&path).expect("save id image");
    assert!(path.exists());
    let _ = std::fs::remove_dir_all(&dir);
}
