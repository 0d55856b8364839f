//! Renderer configuration: translucent sort tolerance, texture-layer limits, render target formats.

/// Default angular tolerance (radians) for treating an orthographic view as axis-aligned.
pub const DEFAULT_CARDINAL_TOLERANCE: f32 = 0.01;

#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Max angle between the ground-projected view direction and a cardinal axis for the
    /// orthographic fast path.
    pub cardinal_tolerance: f32,
    /// Overrides the device-reported texture-layer limit when set (the smaller of the two wins).
    pub max_texture_layers: Option<u32>,
    /// Texture-layer cap requested from the wgpu device; clamped by the adapter limits.
    pub device_max_texture_layers: u32,
    /// Offscreen color target format.
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    /// RGBA clear color of the color target.
    pub clear_color: [f64; 4],
}

impl RendererConfig {
    pub fn with_cardinal_tolerance(mut self, tolerance: f32) -> Self {
        self.cardinal_tolerance = tolerance;
        self
    }

    pub fn with_max_texture_layers(mut self, layers: u32) -> Self {
        self.max_texture_layers = Some(layers);
        self
    }

    /// Effective layer limit given what the device reports.
    pub fn texture_layer_limit(&self, device_reported: u32) -> u32 {
        match self.max_texture_layers {
            Some(layers) => layers.min(device_reported),
            None => device_reported,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            cardinal_tolerance: DEFAULT_CARDINAL_TOLERANCE,
            max_texture_layers: None,
            device_max_texture_layers: 4,
            color_format: wgpu::TextureFormat::Rgba8Unorm,
            depth_format: wgpu::TextureFormat::Depth32Float,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
