//! RenderPass trait - single-subpass color pass

use crate::graphics_device::{AsAny, TextureFormat};

/// Render pass with one color attachment: cleared on load, stored, left ready to present
pub trait RenderPass: AsAny + Send + Sync {
    fn color_format(&self) -> TextureFormat;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub color_format: TextureFormat,
}
