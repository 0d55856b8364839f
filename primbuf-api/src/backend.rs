//! Trait for render backends. The host uses this to call prepare/render_frame uniformly.

use crate::source::PrimitiveBuffer;
use crate::view::FrameView;

/// Render backend the host drives once per scene load and once per frame.
pub trait RenderBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build GPU-resident geometry for a scene. Replaces (and releases) any previous scene.
    fn prepare(&mut self, source: PrimitiveBuffer) -> Result<(), Self::Error>;

    /// Render one frame. Submits work internally; the caller does not submit command buffers.
    fn render_frame(&mut self, view: &FrameView) -> Result<(), Self::Error>;

    /// Free device-side resources of the current scene. Safe to call more than once.
    fn release(&mut self);
}
