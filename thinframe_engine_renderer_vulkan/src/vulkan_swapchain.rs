/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Negotiates image count, extent, format and present mode with the surface,
/// then hands out image views and runs acquire/present on the present queue.

use ash::vk;
use std::sync::Arc;
use thinframe_engine::thinframe::render::{
    choose_extent, choose_format, choose_image_count, choose_present_mode, AcquireOutcome, Extent2D,
    PresentMode, PresentOutcome, RenderTarget, Semaphore, Swapchain, SwapchainDesc, TextureFormat,
};
use thinframe_engine::thinframe::{Error, FrameError, Result};
use thinframe_engine::{engine_debug, engine_err};

use crate::vulkan::{
    extent_from_vk, present_mode_from_vk, present_mode_to_vk, texture_format_from_vk, texture_format_to_vk,
};
use crate::vulkan_context::GpuContext;
use crate::vulkan_render_target::VulkanRenderTarget;
use crate::vulkan_sync::vk_semaphore;

pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: TextureFormat,
    extent: Extent2D,
    present_mode: PresentMode,
}

impl VulkanSwapchain {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &SwapchainDesc) -> Result<Self> {
        unsafe {
            let surface = ctx.surface();
            let surface_loader = ctx.surface_loader();

            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, surface)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to get surface capabilities: {:?}", e))?;
            let surface_formats = surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, surface)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to query surface formats: {:?}", e))?;
            let surface_modes = surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, surface)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to query present modes: {:?}", e))?;

            // Formats the engine can name, in the order the surface reports them
            let known_formats: Vec<(TextureFormat, vk::SurfaceFormatKHR)> = surface_formats
                .iter()
                .filter_map(|f| texture_format_from_vk(f.format).map(|format| (format, *f)))
                .collect();
            let candidates: Vec<TextureFormat> = known_formats.iter().map(|(format, _)| *format).collect();
            let format = choose_format(desc.preferred_format, &candidates).ok_or_else(|| {
                engine_err!("thinframe::vulkan", "Surface reports no supported color format: {:?}", surface_formats)
            })?;
            let color_space = known_formats
                .iter()
                .find(|(f, _)| *f == format)
                .map(|(_, surface_format)| surface_format.color_space)
                .unwrap_or(vk::ColorSpaceKHR::SRGB_NONLINEAR);

            let supported_modes: Vec<PresentMode> =
                surface_modes.iter().filter_map(|mode| present_mode_from_vk(*mode)).collect();
            let present_mode = choose_present_mode(desc.present_mode, &supported_modes);
            if present_mode != desc.present_mode {
                engine_debug!(
                    "thinframe::vulkan",
                    "Present mode {:?} unsupported, falling back to {:?}",
                    desc.present_mode,
                    present_mode
                );
            }

            let current = if capabilities.current_extent.width == u32::MAX {
                None
            } else {
                Some(extent_from_vk(capabilities.current_extent))
            };
            let extent = choose_extent(
                current,
                desc.extent,
                extent_from_vk(capabilities.min_image_extent),
                extent_from_vk(capabilities.max_image_extent),
            );
            let image_count = choose_image_count(capabilities.min_image_count, capabilities.max_image_count);

            let queue_families = [ctx.families.graphics, ctx.families.present];
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(image_count)
                .image_format(texture_format_to_vk(format))
                .image_color_space(color_space)
                .image_extent(vk::Extent2D { width: extent.width, height: extent.height })
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode_to_vk(present_mode))
                .clipped(true);
            create_info = if ctx.families.shared() {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            } else {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_families)
            };

            let swapchain = ctx
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create swapchain: {:?}", e))?;

            let images = match ctx.swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    ctx.swapchain_loader.destroy_swapchain(swapchain, None);
                    return Err(engine_err!("thinframe::vulkan", "Failed to get swapchain images: {:?}", e));
                }
            };

            engine_debug!(
                "thinframe::vulkan",
                "Swapchain created: {} images, {}x{}, {:?}, {:?}",
                images.len(),
                extent.width,
                extent.height,
                format,
                present_mode
            );

            Ok(Self { ctx, swapchain, images, format, extent, present_mode })
        }
    }
}

impl Swapchain for VulkanSwapchain {
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome> {
        let semaphore = vk_semaphore(signal)?;
        let result = unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(Error::Frame(FrameError::Acquire(format!("vkAcquireNextImageKHR: {:?}", e)))),
        }
    }

    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        let wait_semaphores = [vk_semaphore(wait)?];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let _queues = self.ctx.queues();
            unsafe { self.ctx.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) }
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(Error::Frame(FrameError::Present(format!("vkQueuePresentKHR: {:?}", e)))),
        }
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    fn create_image_view(&self, index: usize) -> Result<Box<dyn RenderTarget>> {
        let image = *self.images.get(index).ok_or_else(|| {
            Error::InvalidResource(format!("Swapchain image {} of {}", index, self.images.len()))
        })?;
        Ok(Box::new(VulkanRenderTarget::new(self.ctx.clone(), image, self.format, self.extent)?))
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
