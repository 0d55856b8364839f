//! Errors surfaced by the plugin to the host.

use primbuf_api::DeviceError;
use primbuf_renderer::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("no compatible graphics adapter")]
    NoAdapter,
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("render_frame called before prepare")]
    NotPrepared,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
