//! Shared primitive-buffer API.
//! Defines the scene data model (vertex pool, primitives, materials), the camera/frame view, the
//! `GraphicsDevice` contract the renderer draws through, and the `RenderBackend` trait the host uses.

mod backend;
mod device;
mod material;
mod pool;
mod primitive;
mod source;
mod view;

pub use backend::RenderBackend;
pub use device::{BufferId, DeviceError, GraphicsDevice, VertexLayout};
pub use material::{Material, MaterialId, TextureId, TextureLayer, Transparency};
pub use pool::{VertexIndex, VertexPool};
pub use primitive::{Primitive, Topology};
pub use source::{PrimitiveBuffer, PrimitiveSource, SourceError};
pub use view::{to_device_space, Camera, FrameView, Projection};
pub use glam;
