//! Shared vertex pool. Primitives reference positions by [`VertexIndex`]; the pool never hands out
//! references into its storage, so handles stay valid as the pool grows.

use std::collections::HashMap;

use glam::Vec3;

/// Stable handle of a position in a [`VertexPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexIndex(pub u32);

impl VertexIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for VertexIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Arena of world-space positions (y up, ground plane x/z, north = +z).
/// Bit-identical positions share one slot.
#[derive(Debug, Default, Clone)]
pub struct VertexPool {
    positions: Vec<Vec3>,
    lookup: HashMap<[u32; 3], VertexIndex>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a position, returning the existing handle if the same position was inserted before.
    pub fn insert(&mut self, position: Vec3) -> VertexIndex {
        let key = [position.x.to_bits(), position.y.to_bits(), position.z.to_bits()];
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = VertexIndex(self.positions.len() as u32);
        self.positions.push(position);
        self.lookup.insert(key, index);
        index
    }

    pub fn get(&self, index: VertexIndex) -> Option<Vec3> {
        self.positions.get(index.as_usize()).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
