//! Presentation chain - swapchain, image views, render pass and framebuffers
//!
//! Built in that order and dropped in reverse. The chain is never patched in
//! place: a resize replaces the whole value.

use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{
    AcquireOutcome, Extent2D, Framebuffer, FramebufferDesc, GraphicsDevice, PresentOutcome,
    RenderPass, RenderPassDesc, RenderTarget, Semaphore, Swapchain, SwapchainDesc, TextureFormat,
};

pub struct PresentationChain {
    // Field order is drop order
    framebuffers: Vec<Box<dyn Framebuffer>>,
    render_pass: Arc<dyn RenderPass>,
    image_views: Vec<Box<dyn RenderTarget>>,
    swapchain: Box<dyn Swapchain>,
    extent: Extent2D,
    generation: u64,
}

impl PresentationChain {
    /// Build a chain for the device's surface
    ///
    /// `generation` tags the chain so command lists recorded against an older
    /// chain can be detected.
    pub fn create(
        device: &dyn GraphicsDevice,
        extent: Extent2D,
        config: &Config,
        generation: u64,
    ) -> Result<Self> {
        let swapchain = device.create_swapchain(&SwapchainDesc {
            extent,
            present_mode: config.present_mode,
            preferred_format: TextureFormat::B8G8R8A8_SRGB,
        })?;

        let image_count = swapchain.image_count();
        let image_views = (0..image_count)
            .map(|index| swapchain.create_image_view(index))
            .collect::<Result<Vec<_>>>()?;

        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_format: swapchain.format(),
        })?;

        let extent = swapchain.extent();
        let framebuffers = image_views
            .iter()
            .map(|view| {
                device.create_framebuffer(&FramebufferDesc {
                    render_pass: render_pass.as_ref(),
                    color_attachment: view.as_ref(),
                    extent,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        crate::engine_debug!(
            "thinframe::PresentationChain",
            "Chain #{} ready: {} images, {}x{}, {:?}",
            generation, image_count, extent.width, extent.height, swapchain.present_mode()
        );

        Ok(Self {
            framebuffers,
            render_pass,
            image_views,
            swapchain,
            extent,
            generation,
        })
    }

    pub fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome> {
        self.swapchain.acquire_next_image(signal)
    }

    pub fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        self.swapchain.present(image_index, wait)
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub fn image_view_count(&self) -> usize {
        self.image_views.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn framebuffer(&self, image_index: usize) -> Option<&dyn Framebuffer> {
        self.framebuffers.get(image_index).map(|f| f.as_ref())
    }
}

#[cfg(test)]
#[path = "presentation_chain_tests.rs"]
mod tests;
