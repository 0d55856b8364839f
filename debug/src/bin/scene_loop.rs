//! Host loop: build a scene into a PrimitiveBuffer, hand it to PrimbufPlugin as RenderBackend and
//! render a camera orbit (orthographic cardinal views, then perspective) offscreen.

use glam::{Vec2, Vec3};
use primbuf_api::{Camera, FrameView, Material, MaterialId, PrimitiveBuffer, Projection, RenderBackend, TextureId, Topology, Transparency};
use primbuf_bridge::PrimbufPlugin;

const GROUND: MaterialId = MaterialId(1);
const GLASS: MaterialId = MaterialId(2);
const CHECKER: TextureId = TextureId(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let mut plugin = PrimbufPlugin::headless()?;
    upload_checker(&mut plugin)?;

    let mut backend: Box<dyn RenderBackend<Error = primbuf_bridge::BridgeError>> = Box::new(plugin);
    backend.prepare(build_scene())?;

    let ortho = Projection::orthographic(4.0 / 3.0, 30.0, 0.1, 500.0);
    let persp = Projection::perspective(4.0 / 3.0, std::f32::consts::FRAC_PI_4, 0.5, 500.0);
    let headings = [0.0f32, 0.0, 180.0, 90.0, 270.0, 30.0];
    for (frame, heading) in headings.iter().enumerate() {
        backend.render_frame(&orbit_view(heading.to_radians(), ortho))?;
        log::info!("frame {frame}: ortho heading {heading}");
    }
    backend.render_frame(&orbit_view(0.6, persp))?;
    log::info!("frame {}: perspective", headings.len());

    backend.release();
    println!("primbuf scene_loop: OK");
    Ok(())
}

fn upload_checker(plugin: &mut PrimbufPlugin) -> Result<(), primbuf_api::DeviceError> {
    let size = 8u32;
    let pixels: Vec<u8> = (0..size * size)
        .flat_map(|i| {
            let v = if (i % size + i / size) % 2 == 0 { 230 } else { 60 };
            [v, v, v, 255]
        })
        .collect();
    plugin.device_mut().upload_texture_rgba8(CHECKER, size, size, &pixels)
}

/// Textured ground grid plus a row of translucent panes.
fn build_scene() -> PrimitiveBuffer {
    let mut source = PrimitiveBuffer::new();
    source.add_material(Material::new(GROUND, "ground", Transparency::Opaque, [0.6, 0.8, 0.5, 1.0]).with_texture_layer(CHECKER));
    source.add_material(Material::new(GLASS, "glass", Transparency::Translucent, [0.3, 0.5, 1.0, 0.4]));

    for gx in -4..4 {
        for gz in -4..4 {
            let (x, z) = (gx as f32 * 2.0, gz as f32 * 2.0);
            let corners = [Vec3::new(x, 0.0, z), Vec3::new(x + 2.0, 0.0, z), Vec3::new(x + 2.0, 0.0, z + 2.0), Vec3::new(x, 0.0, z + 2.0)];
            let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
            source
                .push_primitive(GROUND, Topology::TriangleFan, &corners, vec![Vec3::Y; 4], vec![uvs])
                .expect("ground material registered");
        }
    }
    for i in 0..6 {
        let z = -5.0 + i as f32 * 2.0;
        let x = (i as f32 * 1.7).sin() * 3.0;
        let pane = [Vec3::new(x - 1.0, 0.0, z), Vec3::new(x + 1.0, 0.0, z), Vec3::new(x - 1.0, 2.0, z), Vec3::new(x + 1.0, 2.0, z)];
        source
            .push_primitive(GLASS, Topology::TriangleStrip, &pane, vec![-Vec3::Z; 4], vec![])
            .expect("glass material registered");
    }
    source
}

/// Camera 20 units out on `heading` (clockwise from north), looking back at the origin.
fn orbit_view(heading: f32, projection: Projection) -> FrameView {
    let direction = Vec3::new(heading.sin(), 0.0, heading.cos());
    let position = Vec3::new(0.0, 12.0, 0.0) - direction * 20.0;
    let mut view = FrameView::new(Camera::new(position, Vec3::ZERO), projection);
    view.viewport_size = (320, 240);
    view
}
