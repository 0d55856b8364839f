//! Primbuf plugin: implements RenderBackend for the host.

use primbuf_api::{FrameView, PrimitiveBuffer, RenderBackend};
use primbuf_renderer::{FrameStats, RendererConfig, SceneRenderer, WgpuDevice};

use crate::error::BridgeError;

/// Owns the wgpu device and the current scene; implements RenderBackend.
pub struct PrimbufPlugin {
    device: WgpuDevice,
    config: RendererConfig,
    scene: Option<SceneRenderer<PrimitiveBuffer>>,
    last_stats: Option<FrameStats>,
}

impl PrimbufPlugin {
    /// Create with wgpu device and queue (default config).
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, BridgeError> {
        Self::new_with_config(device, queue, RendererConfig::default())
    }

    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: RendererConfig) -> Result<Self, BridgeError> {
        let device = WgpuDevice::new(device, queue, &config)?;
        Ok(Self {
            device,
            config,
            scene: None,
            last_stats: None,
        })
    }

    /// Create on the default adapter without a window; frames render offscreen.
    pub fn headless() -> Result<Self, BridgeError> {
        Self::headless_with_config(RendererConfig::default())
    }

    pub fn headless_with_config(config: RendererConfig) -> Result<Self, BridgeError> {
        pollster::block_on(Self::headless_async(config))
    }

    async fn headless_async(config: RendererConfig) -> Result<Self, BridgeError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or(BridgeError::NoAdapter)?;
        log::info!("headless adapter: {:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;
        Self::new_with_config(device, queue, config)
    }

    /// Access the device if the host needs it (e.g. for texture upload or readback).
    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }
    pub fn device_mut(&mut self) -> &mut WgpuDevice {
        &mut self.device
    }
    pub fn scene(&self) -> Option<&SceneRenderer<PrimitiveBuffer>> {
        self.scene.as_ref()
    }
    pub fn last_stats(&self) -> Option<&FrameStats> {
        self.last_stats.as_ref()
    }

    /// RGBA8 pixels of the last rendered frame.
    pub fn read_color_rgba8(&self) -> Result<Vec<u8>, BridgeError> {
        Ok(self.device.read_color_rgba8()?)
    }
}

impl RenderBackend for PrimbufPlugin {
    type Error = BridgeError;

    fn prepare(&mut self, source: PrimitiveBuffer) -> Result<(), BridgeError> {
        self.release();
        let scene = SceneRenderer::new(&mut self.device, source, self.config.clone())?;
        self.scene = Some(scene);
        Ok(())
    }

    fn render_frame(&mut self, view: &FrameView) -> Result<(), BridgeError> {
        let scene = self.scene.as_mut().ok_or(BridgeError::NotPrepared)?;
        self.device.begin_frame(view)?;
        let stats = match scene.render(&mut self.device, view) {
            Ok(stats) => stats,
            Err(err) => {
                self.device.abort_frame();
                return Err(err.into());
            }
        };
        self.device.end_frame()?;
        self.last_stats = Some(stats);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            if let Err(err) = scene.release(&mut self.device) {
                log::warn!("scene release: {err}");
            }
        }
        self.last_stats = None;
    }
}

impl Drop for PrimbufPlugin {
    fn drop(&mut self) {
        self.release();
    }
}
