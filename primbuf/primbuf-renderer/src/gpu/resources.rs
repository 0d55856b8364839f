//! Offscreen frame targets: one color texture and one depth texture, resized on demand.

use primbuf_api::DeviceError;
use wgpu::TextureView;

pub struct FrameTargets {
    pub color: wgpu::Texture,
    pub depth: wgpu::Texture,
    width: u32,
    height: u32,
}

impl FrameTargets {
    /// Reuse `existing` if it already has the requested size, otherwise allocate new targets.
    pub fn ensure_size(
        device: &wgpu::Device,
        existing: Option<Self>,
        width: u32,
        height: u32,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, DeviceError> {
        if width == 0 || height == 0 {
            return Err(DeviceError::Backend(
                "frame targets: width and height must be > 0".to_string(),
            ));
        }
        if let Some(t) = existing {
            if t.width == width && t.height == height && t.color.format() == color_format {
                return Ok(t);
            }
        }
        let make = |label: &str, format: wgpu::TextureFormat, usage: wgpu::TextureUsages| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };
        let color = make(
            "primbuf_color",
            color_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC,
        );
        let depth = make("primbuf_depth", depth_format, wgpu::TextureUsages::RENDER_ATTACHMENT);
        log::debug!("frame targets resized to {width}x{height}");
        Ok(Self { color, depth, width, height })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn color_view(&self) -> TextureView { self.color.create_view(&Default::default()) }
    pub fn depth_view(&self) -> TextureView { self.depth.create_view(&Default::default()) }
}
