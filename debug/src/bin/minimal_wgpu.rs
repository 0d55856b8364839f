//! Minimal wgpu init (no window). Verifies primbuf-renderer's device comes up on this adapter.

use primbuf_api::GraphicsDevice;
use primbuf_renderer::{RendererConfig, WgpuDevice};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .expect("No adapter");
        log::info!("adapter: {:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .expect("No device");
        let device = WgpuDevice::new(device, queue, &RendererConfig::default()).expect("WgpuDevice::new");
        println!("primbuf minimal_wgpu: OK ({} texture layers)", device.max_texture_layers());
    });
}
