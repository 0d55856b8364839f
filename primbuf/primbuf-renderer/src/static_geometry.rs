//! Static geometry: one device vertex buffer per opaque material, built once at scene load.

use primbuf_api::{BufferId, DeviceError, GraphicsDevice, Material, Primitive, PrimitiveSource, VertexLayout};

use crate::error::RenderError;
use crate::layout::{pack_material, PackedVertices};

/// Packed triangle-list geometry of exactly one material. Immutable after construction; the
/// device buffer must be freed with [`release`](Self::release) before the device goes away.
#[derive(Debug)]
pub struct StaticGeometryBuffer {
    material: Material,
    layout: VertexLayout,
    vertex_count: u32,
    buffer: Option<BufferId>,
}

impl StaticGeometryBuffer {
    /// Pack `primitives` and upload them.
    pub fn build<D, S>(
        device: &mut D,
        material: &Material,
        primitives: &[Primitive],
        source: &S,
    ) -> Result<Self, RenderError>
    where
        D: GraphicsDevice + ?Sized,
        S: PrimitiveSource + ?Sized,
    {
        let packed = pack_material(material, primitives, source)?;
        Self::upload(device, material, &packed)
    }

    /// Upload an already packed block.
    pub fn upload<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        material: &Material,
        packed: &PackedVertices,
    ) -> Result<Self, RenderError> {
        let label = format!("static_geometry:{}", material.name);
        let vertex_count = u32::try_from(packed.vertex_count()).map_err(|_| DeviceError::Allocation {
            label: label.clone(),
            size: packed.as_bytes().len() as u64,
            reason: "vertex count exceeds u32".to_string(),
        })?;
        let buffer = device.create_vertex_buffer(&label, packed.as_bytes())?;
        log::debug!(
            "static geometry for {} ({}): {} vertices, stride {}",
            material.id,
            material.name,
            vertex_count,
            packed.layout().stride()
        );
        Ok(Self {
            material: material.clone(),
            layout: *packed.layout(),
            vertex_count,
            buffer: Some(buffer),
        })
    }

    /// Bind the material, then draw the whole buffer as a triangle list.
    pub fn draw<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> Result<(), RenderError> {
        let buffer = self.buffer.ok_or(RenderError::Released {
            material: self.material.id,
        })?;
        device.bind_material(&self.material)?;
        device.draw_buffer(buffer, &self.layout, self.vertex_count)?;
        Ok(())
    }

    /// Free the device buffer. A second call is a no-op.
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> Result<(), RenderError> {
        match self.buffer.take() {
            Some(buffer) => {
                device.delete_buffer(buffer)?;
                log::debug!("released static geometry for {}", self.material.id);
            }
            None => log::debug!("static geometry for {} already released", self.material.id),
        }
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.buffer.is_none()
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }
}

impl Drop for StaticGeometryBuffer {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer {
            log::warn!(
                "static geometry for {} dropped without release, {:?} leaked",
                self.material.id,
                buffer
            );
        }
    }
}
