//! Graphics-device contract the renderer draws through, and the interleaved vertex layout shared
//! by the packer and every device implementation.

use crate::material::Material;

/// Handle of a device-resident vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Fixed interleaved layout of one vertex, all values `f32`:
/// `(u, v)` per texture layer in increasing layer order, then normal `(x, y, -z)`, then
/// position `(x, y, -z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    texture_layers: usize,
}

impl VertexLayout {
    pub const VALUE_SIZE: u64 = std::mem::size_of::<f32>() as u64;

    pub fn for_texture_layers(texture_layers: usize) -> Self {
        Self { texture_layers }
    }

    pub fn texture_layers(&self) -> usize {
        self.texture_layers
    }

    pub fn values_per_vertex(&self) -> usize {
        2 * self.texture_layers + 6
    }

    /// Stride in bytes.
    pub fn stride(&self) -> u64 {
        self.values_per_vertex() as u64 * Self::VALUE_SIZE
    }

    /// Value index (not bytes) of the first texture coordinate of `layer` within a vertex.
    pub fn tex_coord_value_offset(&self, layer: usize) -> usize {
        2 * layer
    }

    pub fn normal_value_offset(&self) -> usize {
        2 * self.texture_layers
    }

    pub fn position_value_offset(&self) -> usize {
        self.normal_value_offset() + 3
    }

    pub fn tex_coord_offset(&self, layer: usize) -> u64 {
        self.tex_coord_value_offset(layer) as u64 * Self::VALUE_SIZE
    }

    pub fn normal_offset(&self) -> u64 {
        self.normal_value_offset() as u64 * Self::VALUE_SIZE
    }

    pub fn position_offset(&self) -> u64 {
        self.position_value_offset() as u64 * Self::VALUE_SIZE
    }

    /// Number of whole vertices in `value_count` interleaved values.
    pub fn vertex_count(&self, value_count: usize) -> usize {
        value_count / self.values_per_vertex()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to allocate buffer '{label}' ({size} bytes): {reason}")]
    Allocation { label: String, size: u64, reason: String },
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("draw issued before any material was bound")]
    NoMaterialBound,
    #[error("draw issued outside of a frame")]
    NoActiveFrame,
    #[error("graphics backend error: {0}")]
    Backend(String),
}

/// Device abstraction the renderer calls into. Single-threaded: one render thread owns the device.
pub trait GraphicsDevice {
    /// Number of texture layers a material may use on this device.
    fn max_texture_layers(&self) -> u32;

    /// Allocate a static vertex buffer initialised with `data`.
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, DeviceError>;

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), DeviceError>;

    /// Bind texture layers and shading parameters for subsequent draws.
    fn bind_material(&mut self, material: &Material) -> Result<(), DeviceError>;

    /// Draw `vertex_count` vertices of a static buffer as a triangle list.
    fn draw_buffer(&mut self, buffer: BufferId, layout: &VertexLayout, vertex_count: u32) -> Result<(), DeviceError>;

    /// Draw transient vertex data as a triangle list.
    fn draw_vertices(&mut self, layout: &VertexLayout, data: &[u8], vertex_count: u32) -> Result<(), DeviceError>;
}
