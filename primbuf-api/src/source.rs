//! Primitive sources: what the renderer consumes at scene-load time.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::material::{Material, MaterialId};
use crate::pool::{VertexIndex, VertexPool};
use crate::primitive::{Primitive, Topology};

/// Material-grouped primitives sharing one vertex pool.
pub trait PrimitiveSource {
    /// All materials, in the order they should be processed.
    fn materials(&self) -> &[Material];

    /// Primitives drawn with `material`; empty for unknown materials.
    fn primitives(&self, material: MaterialId) -> &[Primitive];

    /// Vertex pool lookup.
    fn vertex(&self, index: VertexIndex) -> Option<Vec3>;

    /// Pre-pass run once before the renderer consumes the source.
    fn optimize(&mut self);

    fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials().iter().find(|m| m.id == id)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} is not registered")]
    UnknownMaterial(MaterialId),
}

/// In-memory [`PrimitiveSource`].
#[derive(Debug, Default, Clone)]
pub struct PrimitiveBuffer {
    pool: VertexPool,
    materials: Vec<Material>,
    primitives: HashMap<MaterialId, Vec<Primitive>>,
}

impl PrimitiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material. Re-registering an id replaces the material but keeps its primitives.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = material.id;
        match self.materials.iter_mut().find(|m| m.id == id) {
            Some(existing) => *existing = material,
            None => self.materials.push(material),
        }
        self.primitives.entry(id).or_default();
        id
    }

    pub fn add_vertex(&mut self, position: Vec3) -> VertexIndex {
        self.pool.insert(position)
    }

    pub fn add_primitive(&mut self, material: MaterialId, primitive: Primitive) -> Result<(), SourceError> {
        self.primitives
            .get_mut(&material)
            .ok_or(SourceError::UnknownMaterial(material))?
            .push(primitive);
        Ok(())
    }

    /// Insert `positions` into the pool and add the resulting primitive.
    pub fn push_primitive(
        &mut self,
        material: MaterialId,
        topology: Topology,
        positions: &[Vec3],
        normals: Vec<Vec3>,
        tex_coords: Vec<Vec<Vec2>>,
    ) -> Result<(), SourceError> {
        let indices = positions.iter().map(|&p| self.pool.insert(p)).collect();
        let primitive = Primitive::new(topology, indices, normals).with_tex_coords(tex_coords);
        self.add_primitive(material, primitive)
    }

    pub fn pool(&self) -> &VertexPool {
        &self.pool
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.values().map(Vec::len).sum()
    }
}

impl PrimitiveSource for PrimitiveBuffer {
    fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn primitives(&self, material: MaterialId) -> &[Primitive] {
        self.primitives.get(&material).map(Vec::as_slice).unwrap_or(&[])
    }

    fn vertex(&self, index: VertexIndex) -> Option<Vec3> {
        self.pool.get(index)
    }

    /// Merge the well-formed triangle lists of each non-translucent material into one triangle
    /// list. Translucent primitives are the unit of sorting and stay separate. Primitives whose
    /// attribute lengths disagree, or whose layer count differs from the material's, are left
    /// untouched in their original order so validation still sees them.
    fn optimize(&mut self) {
        for material in &self.materials {
            if material.is_translucent() {
                continue;
            }
            let Some(list) = self.primitives.get_mut(&material.id) else {
                continue;
            };
            let layers = material.texture_layer_count();
            let before = list.len();
            let mut kept = Vec::with_capacity(before);
            let mut merged: Option<Primitive> = None;
            for primitive in list.drain(..) {
                let mergeable = primitive.topology == Topology::Triangles
                    && primitive.tex_coords.len() == layers
                    && primitive.is_consistent();
                if !mergeable {
                    kept.push(primitive);
                    continue;
                }
                match merged.as_mut() {
                    Some(target) => {
                        target.indices.extend(primitive.indices);
                        target.normals.extend(primitive.normals);
                        for (dst, src) in target.tex_coords.iter_mut().zip(primitive.tex_coords) {
                            dst.extend(src);
                        }
                    }
                    None => merged = Some(primitive),
                }
            }
            kept.extend(merged);
            if kept.len() != before {
                log::debug!("optimize: {} primitives {} -> {}", material.id, before, kept.len());
            }
            *list = kept;
        }
    }
}
