/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Binds one swapchain image view to the color render pass. Created once per
/// image and destroyed with the presentation chain.

use ash::vk;
use std::sync::Arc;
use thinframe_engine::engine_err;
use thinframe_engine::thinframe::render::{Extent2D, Framebuffer, FramebufferDesc};
use thinframe_engine::thinframe::{Error, Result};

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_render_target::VulkanRenderTarget;

pub struct VulkanFramebuffer {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    extent: Extent2D,
}

impl VulkanFramebuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        let render_pass = desc
            .render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("framebuffer needs a Vulkan render pass".to_string()))?;
        let target = desc
            .color_attachment
            .as_any()
            .downcast_ref::<VulkanRenderTarget>()
            .ok_or_else(|| Error::InvalidResource("framebuffer needs a Vulkan render target".to_string()))?;

        let attachments = [target.image_view];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(1);

        let framebuffer = unsafe {
            ctx.device()
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create framebuffer: {:?}", e))?
        };

        Ok(Self { ctx, framebuffer, extent: desc.extent })
    }
}

impl Framebuffer for VulkanFramebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_framebuffer(self.framebuffer, None);
        }
    }
}
