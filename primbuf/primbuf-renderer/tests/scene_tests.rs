//! Scene renderer integration tests against the recording device.

mod common;

use common::{Call, RecordingDevice};
use primbuf_api::glam::{Vec2, Vec3};
use primbuf_api::{
    Camera, DeviceError, FrameView, Material, MaterialId, PrimitiveBuffer, Projection, TextureId, Topology,
    Transparency,
};
use primbuf_renderer::{ContractViolation, RenderError, RendererConfig, SceneRenderer, SortOutcome};
use rstest::rstest;

const WALL: MaterialId = MaterialId(1);
const GLASS: MaterialId = MaterialId(2);
const SMOKE: MaterialId = MaterialId(3);

fn triangle_at(center: Vec3) -> [Vec3; 3] {
    [
        center + Vec3::new(-0.5, 0.0, 0.0),
        center + Vec3::new(0.5, 0.0, 0.0),
        center + Vec3::new(0.0, 1.0, 0.0),
    ]
}

fn add_triangle(source: &mut PrimitiveBuffer, material: MaterialId, center: Vec3) {
    source
        .push_primitive(material, Topology::Triangles, &triangle_at(center), vec![Vec3::Y; 3], vec![])
        .unwrap();
}

fn wall() -> Material {
    Material::new(WALL, "wall", Transparency::Opaque, [0.8, 0.8, 0.8, 1.0])
}

fn glass() -> Material {
    Material::new(GLASS, "glass", Transparency::Translucent, [0.2, 0.4, 1.0, 0.5])
}

/// Two opaque triangles and three translucent ones at increasing distance along +z, x and -x.
fn mixed_scene() -> PrimitiveBuffer {
    let mut source = PrimitiveBuffer::new();
    source.add_material(wall());
    source.add_material(glass());
    add_triangle(&mut source, WALL, Vec3::new(0.0, 0.0, 20.0));
    add_triangle(&mut source, WALL, Vec3::new(3.0, 0.0, 20.0));
    add_triangle(&mut source, GLASS, Vec3::new(0.0, 0.0, 4.0));
    add_triangle(&mut source, GLASS, Vec3::new(1.0, 0.0, 12.0));
    add_triangle(&mut source, GLASS, Vec3::new(-2.0, 0.0, 7.0));
    source
}

fn perspective_view() -> FrameView {
    FrameView::new(Camera::new(Vec3::ZERO, Vec3::Z), Projection::default())
}

fn north_ortho_view() -> FrameView {
    let position = Vec3::new(0.0, 50.0, -50.0);
    FrameView::new(
        Camera::new(position, position + Vec3::new(0.0, -1.0, 1.0)),
        Projection::orthographic(1.0, 100.0, 0.1, 1000.0),
    )
}

#[test]
fn opaque_and_translucent_primitives_are_partitioned() {
    let mut device = RecordingDevice::new();
    let renderer = SceneRenderer::new(&mut device, mixed_scene(), RendererConfig::default()).unwrap();

    let wall_buffer = renderer.static_buffer(WALL).expect("opaque material gets a buffer");
    assert_eq!(wall_buffer.vertex_count(), 6);
    assert!(renderer.static_buffer(GLASS).is_none());

    let entries = renderer.translucent_entries();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.material == GLASS));
    assert_eq!(device.created().len(), 1);
}

#[test]
fn translucent_entries_are_drawn_farthest_first_under_perspective() {
    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, mixed_scene(), RendererConfig::default()).unwrap();
    device.clear_calls();

    let view = perspective_view();
    let stats = renderer.render(&mut device, &view).unwrap();

    assert_eq!(stats.sort, SortOutcome::DistanceSorted);
    assert_eq!(stats.static_draws, 1);
    assert_eq!(stats.translucent_draws, 3);

    let order: Vec<usize> = renderer.translucent_entries().iter().map(|e| e.primitive).collect();
    assert_eq!(order, vec![1, 2, 0]);

    let distances: Vec<f32> = device
        .transient_centroids()
        .iter()
        .map(|c| c.distance(view.camera.position))
        .collect();
    assert_eq!(distances.len(), 3);
    assert!(distances.windows(2).all(|w| w[0] > w[1]), "not farthest-first: {distances:?}");
}

#[test]
fn static_geometry_is_drawn_before_translucent_geometry() {
    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, mixed_scene(), RendererConfig::default()).unwrap();
    let wall_buffer = renderer.static_buffer(WALL).and_then(|b| b.buffer()).unwrap();
    device.clear_calls();

    renderer.render(&mut device, &perspective_view()).unwrap();

    assert_eq!(device.calls[0], Call::Bind(WALL));
    assert_eq!(
        device.calls[1],
        Call::DrawBuffer {
            buffer: wall_buffer,
            texture_layers: 0,
            vertex_count: 6
        }
    );
    assert_eq!(device.calls[2], Call::Bind(GLASS));
    assert!(device.calls[3..]
        .iter()
        .all(|c| matches!(c, Call::DrawVertices { texture_layers: 0, vertex_count: 3, .. })));
    assert_eq!(device.calls.len(), 6);
}

#[test]
fn consecutive_entries_of_one_material_share_a_bind() {
    let mut source = PrimitiveBuffer::new();
    source.add_material(glass());
    source.add_material(Material::new(SMOKE, "smoke", Transparency::Translucent, [0.1, 0.1, 0.1, 0.3]));
    add_triangle(&mut source, GLASS, Vec3::new(0.0, 0.0, 10.0));
    add_triangle(&mut source, GLASS, Vec3::new(0.0, 0.0, 8.0));
    add_triangle(&mut source, GLASS, Vec3::new(0.0, 0.0, 2.0));
    add_triangle(&mut source, SMOKE, Vec3::new(0.0, 0.0, 5.0));

    let mut device = RecordingDevice::new();
    let mut renderer = SceneRenderer::new(&mut device, source, RendererConfig::default()).unwrap();
    let stats = renderer.render(&mut device, &north_ortho_view()).unwrap();

    assert_eq!(stats.material_switches, 3);
    assert_eq!(device.binds(), vec![GLASS, SMOKE, GLASS]);
    let z: Vec<f32> = device.transient_centroids().iter().map(|c| c.z).collect();
    assert_eq!(z, vec![10.0, 8.0, 5.0, 2.0]);
}

#[test]
fn release_is_idempotent_and_blocks_rendering() {
    let mut device = RecordingDevice::new();
    let mut source = mixed_scene();
    source.add_material(Material::new(MaterialId(7), "cutout", Transparency::Binary, [1.0; 4]));
    add_triangle(&mut source, MaterialId(7), Vec3::new(0.0, 2.0, 9.0));
    let mut renderer = SceneRenderer::new(&mut device, source, RendererConfig::default()).unwrap();
    assert_eq!(device.created().len(), 2);

    renderer.release(&mut device).unwrap();
    assert_eq!(device.deleted(), device.created());
    assert_eq!(device.live_buffers(), 0);
    assert!(renderer.is_released());

    renderer.release(&mut device).unwrap();
    assert_eq!(device.deleted().len(), 2);

    let err = renderer.render(&mut device, &perspective_view()).unwrap_err();
    assert!(matches!(err, RenderError::SceneReleased));
}

#[test]
fn allocation_failure_frees_buffers_created_so_far() {
    let mut source = PrimitiveBuffer::new();
    for id in 1..=3 {
        let material = MaterialId(id);
        source.add_material(Material::new(material, format!("opaque-{id}"), Transparency::Opaque, [1.0; 4]));
        add_triangle(&mut source, material, Vec3::new(id as f32, 0.0, 0.0));
    }
    let mut device = RecordingDevice::new().failing_after(1);

    let err = SceneRenderer::new(&mut device, source, RendererConfig::default()).err().unwrap();

    assert!(matches!(err, RenderError::Device(DeviceError::Allocation { .. })), "{err}");
    assert_eq!(device.created().len(), 1);
    assert_eq!(device.deleted(), device.created());
    assert_eq!(device.live_buffers(), 0);
}

#[rstest]
#[case::device_limit(1, None, 1)]
#[case::config_override(4, Some(1), 1)]
#[case::override_above_device(1, Some(8), 1)]
fn materials_above_the_layer_limit_are_rejected(
    #[case] device_layers: u32,
    #[case] config_layers: Option<u32>,
    #[case] expected_max: u32,
) {
    let mut source = PrimitiveBuffer::new();
    let material = Material::new(WALL, "layered", Transparency::Opaque, [1.0; 4])
        .with_texture_layer(TextureId(0))
        .with_texture_layer(TextureId(1));
    source.add_material(material);
    source
        .push_primitive(
            WALL,
            Topology::Triangles,
            &triangle_at(Vec3::ZERO),
            vec![Vec3::Y; 3],
            vec![vec![Vec2::ZERO; 3], vec![Vec2::ONE; 3]],
        )
        .unwrap();
    let mut config = RendererConfig::default();
    config.max_texture_layers = config_layers;
    let mut device = RecordingDevice::new().with_max_texture_layers(device_layers);

    let err = SceneRenderer::new(&mut device, source, config).err().unwrap();

    match err {
        RenderError::TooManyTextureLayers { material, layers, max } => {
            assert_eq!(material, WALL);
            assert_eq!(layers, 2);
            assert_eq!(max, expected_max);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(device.created().is_empty());
}

#[test]
fn malformed_translucent_primitive_fails_construction() {
    let mut source = mixed_scene();
    source
        .push_primitive(GLASS, Topology::Triangles, &triangle_at(Vec3::Z), vec![Vec3::Y; 2], vec![])
        .unwrap();
    let mut device = RecordingDevice::new();

    let err = SceneRenderer::new(&mut device, source, RendererConfig::default()).err().unwrap();

    match err {
        RenderError::Contract {
            material,
            primitive,
            violation,
        } => {
            assert_eq!(material, GLASS);
            assert_eq!(primitive, 3);
            assert_eq!(violation, ContractViolation::NormalCount { expected: 3, found: 2 });
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(device.live_buffers(), 0, "no buffer survives a failed construction");
}

#[test]
fn malformed_opaque_strip_fails_construction() {
    let mut source = PrimitiveBuffer::new();
    source.add_material(wall());
    let positions: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32, (i % 2) as f32, 0.0)).collect();
    source
        .push_primitive(WALL, Topology::TriangleStrip, &positions, vec![Vec3::Y; 4], vec![vec![Vec2::ZERO; 4]])
        .unwrap();
    let mut device = RecordingDevice::new();

    let err = SceneRenderer::new(&mut device, source, RendererConfig::default()).err().unwrap();

    assert!(matches!(
        err,
        RenderError::Contract {
            material: WALL,
            primitive: 0,
            violation: ContractViolation::TexCoordLayers { expected: 0, found: 1 }
        }
    ));
}

/// Pairs of opaque triangle lists that would look valid if concatenated.
#[rstest]
#[case::normals_short_then_long(3, 2, 3, 4, 0, ContractViolation::NormalCount { expected: 3, found: 2 })]
#[case::normals_fine_then_long(3, 3, 3, 4, 1, ContractViolation::NormalCount { expected: 3, found: 4 })]
#[case::four_then_two_indices(4, 4, 2, 2, 0, ContractViolation::TriangleListLength { found: 4 })]
fn malformed_opaque_triangle_lists_are_not_merged_away(
    #[case] first_len: usize,
    #[case] first_normals: usize,
    #[case] second_len: usize,
    #[case] second_normals: usize,
    #[case] expected_primitive: usize,
    #[case] expected: ContractViolation,
) {
    let mut source = PrimitiveBuffer::new();
    source.add_material(wall());
    let points = |len: usize, x: f32| -> Vec<Vec3> { (0..len).map(|i| Vec3::new(x, i as f32, 0.0)).collect() };
    source
        .push_primitive(WALL, Topology::Triangles, &points(first_len, 0.0), vec![Vec3::Y; first_normals], vec![])
        .unwrap();
    source
        .push_primitive(WALL, Topology::Triangles, &points(second_len, 5.0), vec![Vec3::Y; second_normals], vec![])
        .unwrap();
    add_triangle(&mut source, WALL, Vec3::new(0.0, 0.0, 9.0));
    let mut device = RecordingDevice::new();

    let err = SceneRenderer::new(&mut device, source, RendererConfig::default()).err().unwrap();

    match err {
        RenderError::Contract {
            material,
            primitive,
            violation,
        } => {
            assert_eq!(material, WALL);
            assert_eq!(primitive, expected_primitive);
            assert_eq!(violation, expected);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(device.created().is_empty());
}

#[test]
fn empty_opaque_material_gets_no_buffer() {
    let mut source = mixed_scene();
    source.add_material(Material::new(MaterialId(9), "unused", Transparency::Opaque, [1.0; 4]));
    let mut device = RecordingDevice::new();

    let renderer = SceneRenderer::new(&mut device, source, RendererConfig::default()).unwrap();

    assert!(renderer.static_buffer(MaterialId(9)).is_none());
    assert_eq!(renderer.static_buffers().count(), 1);
    assert_eq!(device.created().len(), 1);
}

#[test]
fn mixed_topologies_share_one_static_buffer() {
    let mut source = PrimitiveBuffer::new();
    source.add_material(wall());
    let strip: Vec<Vec3> = (0..5).map(|i| Vec3::new(i as f32, (i % 2) as f32, 0.0)).collect();
    let fan = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
    source
        .push_primitive(WALL, Topology::TriangleStrip, &strip, vec![Vec3::Z; 5], vec![])
        .unwrap();
    source
        .push_primitive(WALL, Topology::TriangleFan, &fan, vec![Vec3::Z; 4], vec![])
        .unwrap();
    add_triangle(&mut source, WALL, Vec3::new(0.0, 0.0, 3.0));
    add_triangle(&mut source, WALL, Vec3::new(0.0, 0.0, 6.0));
    let mut device = RecordingDevice::new();

    let renderer = SceneRenderer::new(&mut device, source, RendererConfig::default()).unwrap();

    let buffer = renderer.static_buffer(WALL).unwrap();
    assert_eq!(buffer.vertex_count(), 9 + 6 + 6);
    let id = buffer.buffer().unwrap();
    assert_eq!(device.buffer_values(id).unwrap().len(), 21 * 6);
    assert_eq!(device.created().len(), 1);
}
