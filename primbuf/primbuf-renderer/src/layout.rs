//! Vertex layout packing: flatten one material's primitives into a single interleaved
//! triangle-list block matching [`VertexLayout`].

use glam::{Vec2, Vec3};
use primbuf_api::{to_device_space, Material, Primitive, PrimitiveSource, Topology, VertexLayout};

use crate::error::{ContractViolation, RenderError};
use crate::triangulate::to_triangle_list;

/// Interleaved `f32` vertex data plus the layout it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedVertices {
    layout: VertexLayout,
    values: Vec<f32>,
}

/// One vertex read back out of a packed block (device space, z already negated).
#[derive(Debug, Clone, PartialEq)]
pub struct PackedVertex {
    pub tex_coords: Vec<Vec2>,
    pub normal: Vec3,
    pub position: Vec3,
}

impl PackedVertices {
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }

    pub fn vertex_count(&self) -> usize {
        self.layout.vertex_count(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode vertex `index` using the layout's offsets.
    pub fn vertex(&self, index: usize) -> Option<PackedVertex> {
        let per_vertex = self.layout.values_per_vertex();
        let v = self.values.get(index * per_vertex..(index + 1) * per_vertex)?;
        let tex_coords = (0..self.layout.texture_layers())
            .map(|layer| {
                let o = self.layout.tex_coord_value_offset(layer);
                Vec2::new(v[o], v[o + 1])
            })
            .collect();
        let n = self.layout.normal_value_offset();
        let p = self.layout.position_value_offset();
        Some(PackedVertex {
            tex_coords,
            normal: Vec3::new(v[n], v[n + 1], v[n + 2]),
            position: Vec3::new(v[p], v[p + 1], v[p + 2]),
        })
    }
}

/// Check a primitive's attribute sequences against its topology and its material.
pub fn validate_primitive(material: &Material, primitive: &Primitive) -> Result<(), ContractViolation> {
    let len = primitive.indices.len();
    match primitive.topology {
        Topology::Triangles if len == 0 || len % 3 != 0 => {
            return Err(ContractViolation::TriangleListLength { found: len });
        }
        Topology::TriangleStrip | Topology::TriangleFan if len < 3 => {
            return Err(ContractViolation::TooFewIndices { found: len });
        }
        _ => {}
    }
    if primitive.normals.len() != len {
        return Err(ContractViolation::NormalCount {
            expected: len,
            found: primitive.normals.len(),
        });
    }
    let layers = material.texture_layer_count();
    if primitive.tex_coords.len() != layers {
        return Err(ContractViolation::TexCoordLayers {
            expected: layers,
            found: primitive.tex_coords.len(),
        });
    }
    for (layer, coords) in primitive.tex_coords.iter().enumerate() {
        if coords.len() != len {
            return Err(ContractViolation::TexCoordLength {
                layer,
                expected: len,
                found: coords.len(),
            });
        }
    }
    Ok(())
}

/// Triangle-list vertex total for a set of primitives.
pub fn flattened_vertex_count(primitives: &[Primitive]) -> usize {
    primitives.iter().map(Primitive::vertex_count).sum()
}

/// Resolve a primitive's positions through the vertex pool.
pub fn resolve_positions<S: PrimitiveSource + ?Sized>(
    primitive: &Primitive,
    source: &S,
) -> Result<Vec<Vec3>, ContractViolation> {
    primitive
        .indices
        .iter()
        .map(|&index| source.vertex(index).ok_or(ContractViolation::VertexOutOfRange(index)))
        .collect()
}

/// Validate, flatten and append one primitive to `out` in `layout` order.
pub fn pack_primitive<S: PrimitiveSource + ?Sized>(
    out: &mut Vec<f32>,
    layout: &VertexLayout,
    material: &Material,
    primitive: &Primitive,
    source: &S,
) -> Result<(), ContractViolation> {
    validate_primitive(material, primitive)?;
    let positions = resolve_positions(primitive, source)?;

    let topology = primitive.topology;
    let positions = to_triangle_list(topology, &positions);
    let normals = to_triangle_list(topology, &primitive.normals);
    let tex_coords: Vec<_> = primitive
        .tex_coords
        .iter()
        .map(|layer| to_triangle_list(topology, layer))
        .collect();

    out.reserve(positions.len() * layout.values_per_vertex());
    for i in 0..positions.len() {
        for layer in &tex_coords {
            out.extend_from_slice(&[layer[i].x, layer[i].y]);
        }
        out.extend_from_slice(&to_device_space(normals[i]).to_array());
        out.extend_from_slice(&to_device_space(positions[i]).to_array());
    }
    Ok(())
}

/// Pack every primitive of `material` into one contiguous block.
pub fn pack_material<S: PrimitiveSource + ?Sized>(
    material: &Material,
    primitives: &[Primitive],
    source: &S,
) -> Result<PackedVertices, RenderError> {
    let layout = VertexLayout::for_texture_layers(material.texture_layer_count());
    let mut values = Vec::with_capacity(flattened_vertex_count(primitives) * layout.values_per_vertex());
    for (index, primitive) in primitives.iter().enumerate() {
        pack_primitive(&mut values, &layout, material, primitive, source)
            .map_err(|violation| RenderError::contract(material.id, index, violation))?;
    }
    Ok(PackedVertices { layout, values })
}
