//! Strip/fan to triangle-list conversion. Works on any per-vertex attribute so positions, normals
//! and each texture-coordinate layer can be flattened independently and stay index-aligned.

use std::borrow::Cow;

use primbuf_api::Topology;

/// Flatten `items` (one value per primitive vertex) into triangle-list order.
/// Triangle lists are returned as-is.
pub fn to_triangle_list<T: Copy>(topology: Topology, items: &[T]) -> Cow<'_, [T]> {
    match topology {
        Topology::Triangles => Cow::Borrowed(items),
        Topology::TriangleStrip => Cow::Owned(triangle_list_from_strip(items)),
        Topology::TriangleFan => Cow::Owned(triangle_list_from_fan(items)),
    }
}

/// Odd triangles swap their first two vertices so every triangle keeps the winding of the first.
pub fn triangle_list_from_strip<T: Copy>(items: &[T]) -> Vec<T> {
    let triangles = items.len().saturating_sub(2);
    let mut out = Vec::with_capacity(3 * triangles);
    for i in 0..triangles {
        if i % 2 == 0 {
            out.extend_from_slice(&[items[i], items[i + 1], items[i + 2]]);
        } else {
            out.extend_from_slice(&[items[i + 1], items[i], items[i + 2]]);
        }
    }
    out
}

/// Every triangle shares the apex `items[0]`.
pub fn triangle_list_from_fan<T: Copy>(items: &[T]) -> Vec<T> {
    let triangles = items.len().saturating_sub(2);
    let mut out = Vec::with_capacity(3 * triangles);
    for i in 0..triangles {
        out.extend_from_slice(&[items[0], items[i + 1], items[i + 2]]);
    }
    out
}
