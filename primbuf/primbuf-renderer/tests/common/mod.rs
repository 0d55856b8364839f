//! Recording [`GraphicsDevice`] shared by the integration tests: every call is logged, buffers
//! keep their uploaded data, and allocation failures can be injected.

#![allow(dead_code)]

use std::collections::HashMap;

use primbuf_api::glam::Vec3;
use primbuf_api::{BufferId, DeviceError, GraphicsDevice, Material, MaterialId, VertexLayout};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { id: BufferId, label: String, bytes: usize },
    Delete(BufferId),
    Bind(MaterialId),
    DrawBuffer { buffer: BufferId, texture_layers: usize, vertex_count: u32 },
    DrawVertices { texture_layers: usize, vertex_count: u32, values: Vec<f32> },
}

pub struct RecordingDevice {
    pub calls: Vec<Call>,
    max_texture_layers: u32,
    /// Successful creations left before `create_vertex_buffer` starts failing.
    creates_left: Option<usize>,
    live: HashMap<BufferId, Vec<f32>>,
    next: u64,
    bound: Option<MaterialId>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            max_texture_layers: 4,
            creates_left: None,
            live: HashMap::new(),
            next: 1,
            bound: None,
        }
    }

    pub fn with_max_texture_layers(mut self, layers: u32) -> Self {
        self.max_texture_layers = layers;
        self
    }

    /// Fail every buffer creation after the first `successes`.
    pub fn failing_after(mut self, successes: usize) -> Self {
        self.creates_left = Some(successes);
        self
    }

    pub fn live_buffers(&self) -> usize {
        self.live.len()
    }

    pub fn buffer_values(&self, id: BufferId) -> Option<&[f32]> {
        self.live.get(&id).map(Vec::as_slice)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn created(&self) -> Vec<BufferId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Create { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<BufferId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn binds(&self) -> Vec<MaterialId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Bind(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// World-space centroids of the transient draws, in draw order.
    pub fn transient_centroids(&self) -> Vec<Vec3> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawVertices { texture_layers, values, .. } => {
                    Some(centroid_of(&VertexLayout::for_texture_layers(*texture_layers), values))
                }
                _ => None,
            })
            .collect()
    }
}

fn floats(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Mean position of packed vertices, converted back from device space.
pub fn centroid_of(layout: &VertexLayout, values: &[f32]) -> Vec3 {
    let per_vertex = layout.values_per_vertex();
    let p = layout.position_value_offset();
    let positions: Vec<Vec3> = values
        .chunks_exact(per_vertex)
        .map(|v| Vec3::new(v[p], v[p + 1], -v[p + 2]))
        .collect();
    positions.iter().copied().sum::<Vec3>() / positions.len() as f32
}

impl GraphicsDevice for RecordingDevice {
    fn max_texture_layers(&self) -> u32 {
        self.max_texture_layers
    }

    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, DeviceError> {
        if let Some(left) = self.creates_left.as_mut() {
            if *left == 0 {
                return Err(DeviceError::Allocation {
                    label: label.to_string(),
                    size: data.len() as u64,
                    reason: "out of memory".to_string(),
                });
            }
            *left -= 1;
        }
        let id = BufferId(self.next);
        self.next += 1;
        self.live.insert(id, floats(data));
        self.calls.push(Call::Create {
            id,
            label: label.to_string(),
            bytes: data.len(),
        });
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        self.live.remove(&buffer).ok_or(DeviceError::UnknownBuffer(buffer))?;
        self.calls.push(Call::Delete(buffer));
        Ok(())
    }

    fn bind_material(&mut self, material: &Material) -> Result<(), DeviceError> {
        self.bound = Some(material.id);
        self.calls.push(Call::Bind(material.id));
        Ok(())
    }

    fn draw_buffer(&mut self, buffer: BufferId, layout: &VertexLayout, vertex_count: u32) -> Result<(), DeviceError> {
        self.bound.ok_or(DeviceError::NoMaterialBound)?;
        if !self.live.contains_key(&buffer) {
            return Err(DeviceError::UnknownBuffer(buffer));
        }
        self.calls.push(Call::DrawBuffer {
            buffer,
            texture_layers: layout.texture_layers(),
            vertex_count,
        });
        Ok(())
    }

    fn draw_vertices(&mut self, layout: &VertexLayout, data: &[u8], vertex_count: u32) -> Result<(), DeviceError> {
        self.bound.ok_or(DeviceError::NoMaterialBound)?;
        self.calls.push(Call::DrawVertices {
            texture_layers: layout.texture_layers(),
            vertex_count,
            values: floats(data),
        });
        Ok(())
    }
}
