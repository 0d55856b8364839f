//! Frame-to-frame behaviour of the translucent sort as the camera turns.

mod common;

use common::RecordingDevice;
use primbuf_api::glam::Vec3;
use primbuf_api::{Camera, FrameView, Material, MaterialId, PrimitiveBuffer, Projection, Topology, Transparency};
use primbuf_renderer::{CardinalDirection, RendererConfig, SceneRenderer, SortOutcome};

const GLASS: MaterialId = MaterialId(5);

fn scattered_glass() -> PrimitiveBuffer {
    let centers = [
        Vec3::new(3.0, 0.0, -2.0),
        Vec3::new(-1.0, 1.0, 8.0),
        Vec3::new(0.5, 0.0, 4.0),
        Vec3::new(2.0, 2.0, -6.5),
        Vec3::new(-5.0, 0.0, 1.0),
    ];
    let mut source = PrimitiveBuffer::new();
    source.add_material(Material::new(GLASS, "glass", Transparency::Translucent, [1.0, 1.0, 1.0, 0.4]));
    for c in centers {
        let corners = [c + Vec3::new(-0.2, 0.0, 0.0), c + Vec3::new(0.2, 0.0, 0.0), c + Vec3::new(0.0, 0.3, 0.0)];
        source
            .push_primitive(GLASS, Topology::Triangles, &corners, vec![Vec3::Y; 3], vec![])
            .unwrap();
    }
    source
}

/// Orthographic view towards `direction`, rotated by `offset` radians clockwise.
fn ortho_view(direction: CardinalDirection, offset: f32) -> FrameView {
    let base = match direction {
        CardinalDirection::N => 0.0,
        CardinalDirection::E => std::f32::consts::FRAC_PI_2,
        CardinalDirection::S => std::f32::consts::PI,
        CardinalDirection::W => -std::f32::consts::FRAC_PI_2,
    };
    let angle = base + offset;
    let horizontal = Vec3::new(angle.sin(), 0.0, angle.cos());
    let position = Vec3::new(0.0, 40.0, 0.0) - horizontal * 40.0;
    FrameView::new(
        Camera::new(position, position + horizontal - Vec3::Y),
        Projection::orthographic(1.0, 60.0, 0.1, 500.0),
    )
}

fn order<S: primbuf_api::PrimitiveSource>(renderer: &SceneRenderer<S>) -> Vec<usize> {
    renderer.translucent_entries().iter().map(|e| e.primitive).collect()
}

#[test]
fn turning_around_reverses_into_a_valid_order() {
    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, scattered_glass(), RendererConfig::default()).unwrap();

    let first = renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.0)).unwrap();
    assert_eq!(first.sort, SortOutcome::Resorted(CardinalDirection::N));
    let again = renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.0)).unwrap();
    assert_eq!(again.sort, SortOutcome::Unchanged(CardinalDirection::N));

    let turned = renderer.render(&mut device, &ortho_view(CardinalDirection::S, 0.0)).unwrap();
    assert_eq!(turned.sort, SortOutcome::Reversed(CardinalDirection::S));

    let mut fresh = SceneRenderer::new(&mut device, scattered_glass(), RendererConfig::default()).unwrap();
    let direct = fresh.render(&mut device, &ortho_view(CardinalDirection::S, 0.0)).unwrap();
    assert_eq!(direct.sort, SortOutcome::Resorted(CardinalDirection::S));
    assert_eq!(order(&renderer), order(&fresh));
}

#[test]
fn unchanged_direction_keeps_the_draw_order() {
    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, scattered_glass(), RendererConfig::default()).unwrap();

    renderer.render(&mut device, &ortho_view(CardinalDirection::E, 0.0)).unwrap();
    let before = order(&renderer);
    device.clear_calls();
    let stats = renderer.render(&mut device, &ortho_view(CardinalDirection::E, 0.004)).unwrap();

    assert_eq!(stats.sort, SortOutcome::Unchanged(CardinalDirection::E));
    assert_eq!(order(&renderer), before);
    let x: Vec<f32> = device.transient_centroids().iter().map(|c| c.x).collect();
    assert!(x.windows(2).all(|w| w[0] >= w[1]), "east view must draw largest x first: {x:?}");
}

#[test]
fn quarter_turn_resorts_along_the_new_axis() {
    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, scattered_glass(), RendererConfig::default()).unwrap();

    renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.0)).unwrap();
    device.clear_calls();
    let stats = renderer.render(&mut device, &ortho_view(CardinalDirection::W, 0.0)).unwrap();

    assert_eq!(stats.sort, SortOutcome::Resorted(CardinalDirection::W));
    let x: Vec<f32> = device.transient_centroids().iter().map(|c| c.x).collect();
    assert!(x.windows(2).all(|w| w[0] <= w[1]), "west view must draw smallest x first: {x:?}");
}

#[test]
fn off_axis_and_perspective_views_sort_by_distance() {
    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, scattered_glass(), RendererConfig::default()).unwrap();

    renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.0)).unwrap();
    let skewed = renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.3)).unwrap();
    assert_eq!(skewed.sort, SortOutcome::DistanceSorted);
    assert_eq!(renderer.sorter().last_direction(), None);

    let camera = Camera::new(Vec3::new(0.0, 1.0, -20.0), Vec3::new(0.0, 1.0, 0.0));
    let view = FrameView::new(camera, Projection::default());
    device.clear_calls();
    let stats = renderer.render(&mut device, &view).unwrap();
    assert_eq!(stats.sort, SortOutcome::DistanceSorted);
    let distances: Vec<f32> = device
        .transient_centroids()
        .iter()
        .map(|c| c.distance(camera.position))
        .collect();
    assert!(distances.windows(2).all(|w| w[0] >= w[1]), "{distances:?}");

    let back = renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.0)).unwrap();
    assert_eq!(back.sort, SortOutcome::Resorted(CardinalDirection::N));
}

#[test]
fn wider_tolerance_keeps_the_fast_path() {
    let mut device = RecordingDevice::new();
    let config = RendererConfig::default().with_cardinal_tolerance(0.5);
    let mut renderer = SceneRenderer::new(&mut device, scattered_glass(), config).unwrap();

    let stats = renderer.render(&mut device, &ortho_view(CardinalDirection::N, 0.3)).unwrap();
    assert_eq!(stats.sort, SortOutcome::Resorted(CardinalDirection::N));
}
