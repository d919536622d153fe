/// RenderPass - single-subpass color pass: clear, store, present

use ash::vk;
use std::sync::Arc;
use thinframe_engine::engine_err;
use thinframe_engine::thinframe::render::{RenderPass, RenderPassDesc, TextureFormat};
use thinframe_engine::thinframe::Result;

use crate::vulkan::texture_format_to_vk;
use crate::vulkan_context::GpuContext;

pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    color_format: TextureFormat,
}

impl VulkanRenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(texture_format_to_vk(desc.color_format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let color_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_attachment_ref));

        // Layout transition waits for the acquire semaphore's stage
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&color_attachment))
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe {
            ctx.device()
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create render pass: {:?}", e))?
        };

        Ok(Self { ctx, render_pass, color_format: desc.color_format })
    }
}

impl RenderPass for VulkanRenderPass {
    fn color_format(&self) -> TextureFormat {
        self.color_format
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_render_pass(self.render_pass, None);
        }
    }
}
