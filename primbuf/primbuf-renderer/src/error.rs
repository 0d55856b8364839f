//! Renderer errors.

use primbuf_api::{DeviceError, MaterialId, VertexIndex};

/// Ways a primitive can break the source data contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("strip/fan needs at least 3 indices, got {found}")]
    TooFewIndices { found: usize },
    #[error("triangle list length {found} is not a non-zero multiple of 3")]
    TriangleListLength { found: usize },
    #[error("{found} normals for {expected} indices")]
    NormalCount { expected: usize, found: usize },
    #[error("material declares {expected} texture layers, primitive supplies {found}")]
    TexCoordLayers { expected: usize, found: usize },
    #[error("texture layer {layer}: {found} coordinates for {expected} indices")]
    TexCoordLength { layer: usize, expected: usize, found: usize },
    #[error("vertex {0} is not in the vertex pool")]
    VertexOutOfRange(VertexIndex),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{material}, primitive {primitive}: {violation}")]
    Contract {
        material: MaterialId,
        primitive: usize,
        violation: ContractViolation,
    },
    #[error("{material} uses {layers} texture layers, device supports {max}")]
    TooManyTextureLayers { material: MaterialId, layers: usize, max: u32 },
    #[error("static geometry for {material} used after release")]
    Released { material: MaterialId },
    #[error("scene renderer used after release")]
    SceneReleased,
    #[error("{0} is not registered with the primitive source")]
    UnknownMaterial(MaterialId),
    #[error("{material} has no primitive {primitive}")]
    UnknownPrimitive { material: MaterialId, primitive: usize },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl RenderError {
    pub fn contract(material: MaterialId, primitive: usize, violation: ContractViolation) -> Self {
        Self::Contract {
            material,
            primitive,
            violation,
        }
    }
}
