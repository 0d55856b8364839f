//! Primitives: index lists into the vertex pool plus per-vertex normals and texture coordinates.

use glam::{Vec2, Vec3};

use crate::pool::VertexIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// One drawable unit. `normals` and every `tex_coords` layer run parallel to `indices`.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub topology: Topology,
    pub indices: Vec<VertexIndex>,
    pub normals: Vec<Vec3>,
    /// One sequence per texture layer; empty for untextured primitives.
    pub tex_coords: Vec<Vec<Vec2>>,
}

impl Primitive {
    pub fn new(topology: Topology, indices: Vec<VertexIndex>, normals: Vec<Vec3>) -> Self {
        Self {
            topology,
            indices,
            normals,
            tex_coords: Vec::new(),
        }
    }

    pub fn triangles(indices: Vec<VertexIndex>, normals: Vec<Vec3>) -> Self {
        Self::new(Topology::Triangles, indices, normals)
    }

    pub fn strip(indices: Vec<VertexIndex>, normals: Vec<Vec3>) -> Self {
        Self::new(Topology::TriangleStrip, indices, normals)
    }

    pub fn fan(indices: Vec<VertexIndex>, normals: Vec<Vec3>) -> Self {
        Self::new(Topology::TriangleFan, indices, normals)
    }

    pub fn with_tex_coords(mut self, tex_coords: Vec<Vec<Vec2>>) -> Self {
        self.tex_coords = tex_coords;
        self
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::TriangleStrip | Topology::TriangleFan => self.indices.len().saturating_sub(2),
        }
    }

    /// Whether the index count suits the topology and every attribute sequence matches it.
    pub fn is_consistent(&self) -> bool {
        let len = self.indices.len();
        let counted = match self.topology {
            Topology::Triangles => len > 0 && len % 3 == 0,
            Topology::TriangleStrip | Topology::TriangleFan => len >= 3,
        };
        counted && self.normals.len() == len && self.tex_coords.iter().all(|layer| layer.len() == len)
    }

    /// Number of vertices once flattened into a triangle list.
    pub fn vertex_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len(),
            Topology::TriangleStrip | Topology::TriangleFan => 3 * self.triangle_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(n: u32) -> Vec<VertexIndex> {
        (0..n).map(VertexIndex).collect()
    }

    #[test]
    fn consistency_checks_counts_and_attribute_lengths() {
        assert!(Primitive::triangles(idx(6), vec![Vec3::Z; 6]).is_consistent());
        assert!(!Primitive::triangles(idx(4), vec![Vec3::Z; 4]).is_consistent());
        assert!(!Primitive::triangles(idx(3), vec![Vec3::Z; 2]).is_consistent());
        assert!(!Primitive::fan(idx(2), vec![Vec3::Z; 2]).is_consistent());
        let textured = Primitive::strip(idx(4), vec![Vec3::Z; 4]);
        assert!(textured.clone().with_tex_coords(vec![vec![Vec2::ZERO; 4]]).is_consistent());
        assert!(!textured.with_tex_coords(vec![vec![Vec2::ZERO; 3]]).is_consistent());
    }

    #[test]
    fn flattened_vertex_counts() {
        let tris = Primitive::triangles(idx(6), vec![Vec3::Y; 6]);
        assert_eq!(tris.triangle_count(), 2);
        assert_eq!(tris.vertex_count(), 6);

        let strip = Primitive::strip(idx(5), vec![Vec3::Y; 5]);
        assert_eq!(strip.triangle_count(), 3);
        assert_eq!(strip.vertex_count(), 9);

        let fan = Primitive::fan(idx(2), vec![Vec3::Y; 2]);
        assert_eq!(fan.triangle_count(), 0);
        assert_eq!(fan.vertex_count(), 0);
    }
}
