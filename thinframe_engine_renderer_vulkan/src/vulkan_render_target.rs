/// RenderTarget - color view of one swapchain image
///
/// The view is owned; the image belongs to the swapchain.

use ash::vk;
use std::sync::Arc;
use thinframe_engine::engine_err;
use thinframe_engine::thinframe::render::{Extent2D, RenderTarget, TextureFormat};
use thinframe_engine::thinframe::Result;

use crate::vulkan::texture_format_to_vk;
use crate::vulkan_context::GpuContext;

pub struct VulkanRenderTarget {
    ctx: Arc<GpuContext>,
    pub(crate) image_view: vk::ImageView,
    format: TextureFormat,
    extent: Extent2D,
}

impl VulkanRenderTarget {
    pub(crate) fn new(ctx: Arc<GpuContext>, image: vk::Image, format: TextureFormat, extent: Extent2D) -> Result<Self> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(texture_format_to_vk(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let image_view = unsafe {
            ctx.device()
                .create_image_view(&create_info, None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create swapchain image view: {:?}", e))?
        };

        Ok(Self { ctx, image_view, format, extent })
    }
}

impl RenderTarget for VulkanRenderTarget {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for VulkanRenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_image_view(self.image_view, None);
        }
    }
}
