#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
//! Headless picking over a globe of instanced markers.
//!
//! Run with: RUST_LOG=info cargo run --example globe_picking
//!
//! Places a thousand cube markers and a thousand sphere markers on a globe,
//! renders a few frames with the throttled picker, then sweeps a pointer
//! across the viewport and logs the data behind each hit.

use std::f32::consts::PI;
use std::sync::Arc;

use instapick::*;
use rand::Rng;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const GLOBE_RADIUS: f32 = 1.0;
const MARKERS: usize = 1000;

/// Data behind one marker.
#[derive(Debug, Clone)]
struct Station {
    name: String,
    latitude: f32,
    longitude: f32,
    reading: f32,
}

impl Station {
    fn surface_point(&self, lift: f32) -> Vec3 {
        let (lat, lon) = (self.latitude.to_radians(), self.longitude.to_radians());
        Vec3::new(lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos()) * (GLOBE_RADIUS + lift)
    }

    fn outward(&self) -> Quat {
        Quat::from_rotation_arc(Vec3::Y, self.surface_point(0.0).normalize())
    }
}

fn random_stations(prefix: &str, count: usize, rng: &mut impl Rng) -> Vec<Station> {
    (0..count)
        .map(|i| Station {
            name: format!("{prefix}-{i:04}"),
            latitude: rng.gen_range(-80.0..80.0),
            longitude: rng.gen_range(-180.0..180.0),
            reading: rng.gen_range(0.0..1.0),
        })
        .collect()
}

fn heat(value: f32) -> Vec3 {
    Vec3::new(value, 0.3, 1.0 - value)
}

fn main() -> std::result::Result<(), RenderError> {
    env_logger::init();
    let mut rng = rand::thread_rng();

    let towers = MappedInstances::from_sources(
        Arc::new(MeshGeometry::cuboid(1.0, 1.0, 1.0)),
        random_stations("tower", MARKERS, &mut rng),
        &InstanceGenerators::new()
            .position(|s: &Station| s.surface_point(0.02))
            .orientation(Station::outward)
            .scale(|s: &Station| Vec3::new(0.015, 0.02 + 0.08 * s.reading, 0.015))
            .color(|s: &Station| heat(s.reading)),
    )?;
    let buoys = MappedInstances::from_sources(
        Arc::new(MeshGeometry::uv_sphere(1.0, 12, 6)),
        random_stations("buoy", MARKERS, &mut rng),
        &InstanceGenerators::new()
            .position(|s: &Station| s.surface_point(0.015))
            .scale(|_: &Station| Vec3::splat(0.015))
            .color(|s: &Station| heat(1.0 - s.reading)),
    )?;

    let mut scene = Scene::new();
    let globe = scene.add(SceneObject::mesh(
        "globe",
        MeshGeometry::uv_sphere(GLOBE_RADIUS, 64, 32),
        ShadingMaterial::phong(Vec3::new(0.15, 0.3, 0.6)),
    ));
    let markers = scene.add(SceneObject::group("markers"));
    let tower_set = scene.add_child(
        markers,
        SceneObject::mesh("towers", towers.scene_geometry(), ShadingMaterial::phong(Vec3::ONE)),
    )?;
    let buoy_set = scene.add_child(
        markers,
        SceneObject::mesh("buoys", buoys.scene_geometry(), ShadingMaterial::basic(Vec3::ONE)),
    )?;

    let mut session = PickingSession::new_headless(WIDTH, HEIGHT, Options::default())?;
    log::info!("adapter: {}", session.gpu().adapter_info.name);
    session.camera_mut().look_at_box(Vec3::splat(-GLOBE_RADIUS), Vec3::splat(GLOBE_RADIUS));

    // Spin the globe a little; the picker only refreshes on throttled frames.
    for frame in 0..8 {
        if let Some(object) = scene.get_mut(globe) {
            object.transform = Mat4::from_rotation_y(frame as f32 * PI / 64.0);
        }
        if let Some(object) = scene.get_mut(markers) {
            object.transform = Mat4::from_rotation_y(frame as f32 * PI / 64.0);
        }
        let refreshed = session.render_frame(&scene)?;
        log::debug!("frame {frame}: pick buffer refreshed = {refreshed}");
    }
    if let Some(stats) = session.last_sync() {
        log::info!("mirror: {} proxies", stats.live);
    }

    let y = (HEIGHT / 2) as i32;
    let mut hits = 0;
    for x in (0..WIDTH as i32).step_by(8) {
        let Some(picked) = session.pick(x, y) else { continue };
        hits += 1;
        let station = match (picked.object, picked.instance_index) {
            (object, Some(index)) if object == tower_set => towers.find_source_by_index(index).ok(),
            (object, Some(index)) if object == buoy_set => buoys.find_source_by_index(index).ok(),
            _ => None,
        };
        match station {
            Some(s) => log::info!(
                "({x}, {y}) {} at {:.1}, {:.1}: reading {:.2}",
                s.name,
                s.latitude,
                s.longitude,
                s.reading
            ),
            None if picked.object == globe => log::debug!("({x}, {y}) globe"),
            None => log::debug!("({x}, {y}) {:?}", picked),
        }
    }
    log::info!("{hits} hits along the sweep");

    session.picker().save_id_image("globe_ids.png")?;
    log::info!("wrote globe_ids.png");
    Ok(())
}
