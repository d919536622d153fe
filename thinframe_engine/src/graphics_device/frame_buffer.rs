//! Framebuffer trait - binds one image view to a render pass
//!
//! Created once per swapchain image and recreated only with the chain.

use crate::graphics_device::{AsAny, Extent2D, RenderPass, RenderTarget};

pub trait Framebuffer: AsAny + Send + Sync {
    fn extent(&self) -> Extent2D;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a dyn RenderPass,
    /// The single color attachment
    pub color_attachment: &'a dyn RenderTarget,
    pub extent: Extent2D,
}
