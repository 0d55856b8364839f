//! Primbuf bridge: implements primbuf_api::RenderBackend using primbuf-renderer on wgpu.

mod error;
mod plugin;

pub use error::BridgeError;
pub use plugin::PrimbufPlugin;
