//! Swapchain trait - the presentable image chain of a window surface

use crate::error::Result;
use crate::graphics_device::{AsAny, RenderTarget, Semaphore, TextureFormat};

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True for a minimized window, which cannot own a swapchain
    pub fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp each dimension to `[min, max]`
    pub fn clamp(&self, min: Extent2D, max: Extent2D) -> Extent2D {
        Extent2D {
            width: self.width.clamp(min.width, max.width.max(min.width)),
            height: self.height.clamp(min.height, max.height.max(min.height)),
        }
    }
}

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// Vsync, always supported
    Fifo,
    /// Vsync that tears when a frame is late
    FifoRelaxed,
    /// Triple buffering, no tearing
    Mailbox,
    /// No vsync
    Immediate,
}

/// Parameters for swapchain creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    /// Window size; used only when the surface leaves the extent to the application
    pub extent: Extent2D,
    pub present_mode: PresentMode,
    /// Used when the surface supports it, otherwise the first reported format
    pub preferred_format: TextureFormat,
}

/// Result of an acquire request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is available; the semaphore passed to acquire will be signaled
    Ready {
        image_index: u32,
        /// The chain still works but no longer matches the surface
        suboptimal: bool,
    },
    /// The chain no longer matches the surface and must be rebuilt
    OutOfDate,
}

/// Result of a present request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Set of images a presentation surface rotates through
///
/// Other failures than out-of-date are reported as `Error::Frame`.
pub trait Swapchain: AsAny + Send + Sync {
    /// Request the next image, signaling `signal` when it is ready for rendering
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome>;

    /// Queue image `image_index` for display once `wait` is signaled
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome>;

    fn image_count(&self) -> usize;

    fn extent(&self) -> Extent2D;

    fn format(&self) -> TextureFormat;

    fn present_mode(&self) -> PresentMode;

    /// Create a color view of image `index`
    fn create_image_view(&self, index: usize) -> Result<Box<dyn RenderTarget>>;
}

// ===== SURFACE NEGOTIATION HELPERS =====

/// One more image than the surface minimum, clamped to its maximum
///
/// A `max_image_count` of zero means the surface sets no upper bound.
pub fn choose_image_count(min_image_count: u32, max_image_count: u32) -> u32 {
    let desired = min_image_count.saturating_add(1);
    if max_image_count > 0 {
        desired.min(max_image_count)
    } else {
        desired
    }
}

/// The surface's current extent, or the requested one clamped to the surface limits
///
/// `current` is `None` when the surface lets the application pick the size.
pub fn choose_extent(
    current: Option<Extent2D>,
    requested: Extent2D,
    min: Extent2D,
    max: Extent2D,
) -> Extent2D {
    match current {
        Some(extent) => extent,
        None => requested.clamp(min, max),
    }
}

/// `requested` if the surface supports it, otherwise `Fifo`
pub fn choose_present_mode(requested: PresentMode, supported: &[PresentMode]) -> PresentMode {
    if supported.contains(&requested) {
        requested
    } else {
        PresentMode::Fifo
    }
}

/// `preferred` if supported, otherwise the first supported format
pub fn choose_format(preferred: TextureFormat, supported: &[TextureFormat]) -> Option<TextureFormat> {
    if supported.contains(&preferred) {
        Some(preferred)
    } else {
        supported.first().copied()
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
