/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// The device only creates objects and owns the queues. Swapchains, pipelines
/// and command lists each hold their own `Arc<GpuContext>`, so they can be
/// released in any order relative to the device handle.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;
use thinframe_engine::thinframe::render::{
    BlendFactor, BlendOp, ColorWriteMask, CommandPool, CullMode, DeviceFactory, DeviceInfo, Extent2D, Fence,
    Framebuffer, FramebufferDesc, FrontFace, GraphicsDevice, Pipeline, PipelineDesc, PolygonMode, PresentMode,
    PrimitiveTopology, RenderPass, RenderPassDesc, Semaphore, Shader, ShaderDesc, ShaderStage, Submission,
    Swapchain, SwapchainDesc, TextureFormat, VertexFormat,
};
use thinframe_engine::thinframe::{Config, Error, FrameError, Result};
use thinframe_engine::{engine_debug, engine_err, engine_error};

use crate::vulkan_buffer::{Buffer, TRIANGLE};
use crate::vulkan_command_list::{VulkanCommandList, VulkanCommandPool};
use crate::vulkan_context::GpuContext;
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_shader::VulkanShader;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_sync::{vk_fence, vk_semaphore, VulkanFence, VulkanSemaphore};

// ===== FORMAT CONVERSIONS =====

pub(crate) fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
    }
}

/// Surface formats the engine cannot express are skipped
pub(crate) fn texture_format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        _ => None,
    }
}

pub(crate) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        VertexFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
    }
}

pub(crate) fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        _ => None,
    }
}

pub(crate) fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

// ===== PIPELINE STATE CONVERSIONS =====

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
    }
}

pub(crate) fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
    }
}

pub(crate) fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
    }
}

pub(crate) fn color_write_mask_to_vk(mask: ColorWriteMask) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if mask.contains(ColorWriteMask::R) {
        flags |= vk::ColorComponentFlags::R;
    }
    if mask.contains(ColorWriteMask::G) {
        flags |= vk::ColorComponentFlags::G;
    }
    if mask.contains(ColorWriteMask::B) {
        flags |= vk::ColorComponentFlags::B;
    }
    if mask.contains(ColorWriteMask::A) {
        flags |= vk::ColorComponentFlags::A;
    }
    flags
}

// ===== DEVICE =====

/// Vulkan device
///
/// Central object for creating GPU objects and submitting work. Owns the
/// vertex buffer that every command list binds with its pipelines.
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    triangle: Arc<Buffer>,
}

impl VulkanGraphicsDevice {
    /// Shared context, for code that needs raw Vulkan handles
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.ctx.device_name.clone(),
            backend: "vulkan",
            graphics_queue_family: self.ctx.families.graphics,
            present_queue_family: self.ctx.families.present,
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(VulkanSwapchain::new(self.ctx.clone(), desc)?))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(VulkanRenderPass::new(self.ctx.clone(), desc)?))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Box<dyn Framebuffer>> {
        Ok(Box::new(VulkanFramebuffer::new(self.ctx.clone(), desc)?))
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<Box<dyn Shader>> {
        Ok(Box::new(VulkanShader::new(self.ctx.clone(), desc)?))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Box<dyn Pipeline>> {
        Ok(Box::new(VulkanPipeline::new(self.ctx.clone(), desc)?))
    }

    fn create_command_pool(&self) -> Result<Box<dyn CommandPool>> {
        Ok(Box::new(VulkanCommandPool::new(self.ctx.clone(), self.triangle.clone())?))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(VulkanSemaphore::new(self.ctx.clone())?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(VulkanFence::new(self.ctx.clone(), signaled)?))
    }

    fn wait_for_fence(&self, fence: &dyn Fence) -> Result<()> {
        let fence = vk_fence(fence)?;
        unsafe {
            self.ctx
                .device()
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to wait for fence: {:?}", e))
        }
    }

    fn reset_fence(&self, fence: &dyn Fence) -> Result<()> {
        let fence = vk_fence(fence)?;
        unsafe {
            self.ctx
                .device()
                .reset_fences(&[fence])
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to reset fence: {:?}", e))
        }
    }

    fn submit(&self, submission: &Submission) -> Result<()> {
        let command_buffer = submission
            .command_list
            .as_any()
            .downcast_ref::<VulkanCommandList>()
            .map(|list| list.command_buffer)
            .ok_or_else(|| Error::InvalidResource("not a Vulkan command list".to_string()))?;
        let wait_semaphores = [vk_semaphore(submission.wait_semaphore)?];
        let signal_semaphores = [vk_semaphore(submission.signal_semaphore)?];
        let fence = vk_fence(submission.fence)?;

        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let _queues = self.ctx.queues();
        unsafe {
            self.ctx
                .device()
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| {
                    engine_error!("thinframe::vulkan", "Failed to submit commands to GPU queue: {:?}", e);
                    Error::Frame(FrameError::Submit(format!("{:?}", e)))
                })
        }
    }

    fn wait_idle(&self) -> Result<()> {
        let _queues = self.ctx.queues();
        unsafe {
            self.ctx
                .device()
                .device_wait_idle()
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

// ===== FACTORY =====

/// Creates Vulkan devices for any window exposing raw handles
#[derive(Debug, Default, Clone, Copy)]
pub struct VulkanDeviceFactory;

impl VulkanDeviceFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<W: HasDisplayHandle + HasWindowHandle + ?Sized> DeviceFactory<W> for VulkanDeviceFactory {
    fn create_device(&self, window: &W, config: &Config) -> Result<Arc<dyn GraphicsDevice>> {
        let ctx = Arc::new(GpuContext::new(window, config)?);
        let triangle = Buffer::new_vertex(ctx.clone(), &TRIANGLE).map_err(|e| {
            engine_error!("thinframe::vulkan", "Cannot upload the default vertex buffer: {}", e);
            Error::DeviceCreationFailed(format!("vertex buffer: {}", e))
        })?;
        engine_debug!("thinframe::vulkan", "Vertex buffer ready ({} bytes)", triangle.size());

        Ok(Arc::new(VulkanGraphicsDevice { ctx, triangle: Arc::new(triangle) }))
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
