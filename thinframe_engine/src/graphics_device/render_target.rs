//! RenderTarget trait - a color view of a swapchain image

use crate::graphics_device::{AsAny, Extent2D};

/// Color attachment formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
}

impl Default for TextureFormat {
    fn default() -> Self {
        TextureFormat::B8G8R8A8_SRGB
    }
}

/// Surface that can be rendered to
pub trait RenderTarget: AsAny + Send + Sync {
    fn extent(&self) -> Extent2D;

    fn format(&self) -> TextureFormat;
}
