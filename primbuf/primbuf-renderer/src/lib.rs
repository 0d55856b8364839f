//! Primbuf renderer: per-material static vertex buffers for opaque geometry, back-to-front sorted
//! translucent primitives, and a wgpu [`GraphicsDevice`](primbuf_api::GraphicsDevice).

pub mod config;
pub mod error;
pub mod gpu;
pub mod layout;
pub mod scene;
pub mod static_geometry;
pub mod transparency;
pub mod triangulate;

pub use config::{RendererConfig, DEFAULT_CARDINAL_TOLERANCE};
pub use error::{ContractViolation, RenderError};
pub use gpu::{FrameTargets, WgpuDevice};
pub use layout::{pack_material, pack_primitive, validate_primitive, PackedVertex, PackedVertices};
pub use scene::{FrameStats, SceneRenderer};
pub use static_geometry::StaticGeometryBuffer;
pub use transparency::{CardinalDirection, SortOutcome, TranslucentEntry, TransparencySorter};
pub use triangulate::to_triangle_list;
