/// Command pool and primary command lists
///
/// Lists are recorded once and resubmitted every frame until the pipeline set
/// or the presentation chain changes, so recording never uses
/// ONE_TIME_SUBMIT.

use ash::vk;
use std::sync::Arc;
use thinframe_engine::engine_err;
use thinframe_engine::thinframe::render::{
    ClearValue, CommandList, CommandPool, Framebuffer, Pipeline, Rect2D, RenderPass, Viewport,
};
use thinframe_engine::thinframe::{Error, Result};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;

/// Pool handle shared by the pool and its lists; destroyed with the last of them
struct PoolHandle {
    ctx: Arc<GpuContext>,
    pool: vk::CommandPool,
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_command_pool(self.pool, None);
        }
    }
}

pub struct VulkanCommandPool {
    handle: Arc<PoolHandle>,
    /// Bound at binding 0 with every pipeline
    vertex_buffer: Arc<Buffer>,
}

impl VulkanCommandPool {
    pub(crate) fn new(ctx: Arc<GpuContext>, vertex_buffer: Arc<Buffer>) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.families.graphics)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe {
            ctx.device()
                .create_command_pool(&create_info, None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create command pool: {:?}", e))?
        };
        Ok(Self { handle: Arc::new(PoolHandle { ctx, pool }), vertex_buffer })
    }
}

impl CommandPool for VulkanCommandPool {
    fn allocate(&mut self, count: usize) -> Result<Vec<Box<dyn CommandList>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.handle.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);
        let command_buffers = unsafe {
            self.handle
                .ctx
                .device()
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to allocate {} command buffers: {:?}", count, e))?
        };

        Ok(command_buffers
            .into_iter()
            .map(|command_buffer| {
                Box::new(VulkanCommandList {
                    pool: self.handle.clone(),
                    command_buffer,
                    vertex_buffer: self.vertex_buffer.clone(),
                    is_recording: false,
                    in_render_pass: false,
                }) as Box<dyn CommandList>
            })
            .collect())
    }
}

pub struct VulkanCommandList {
    pool: Arc<PoolHandle>,
    pub(crate) command_buffer: vk::CommandBuffer,
    vertex_buffer: Arc<Buffer>,
    is_recording: bool,
    in_render_pass: bool,
}

impl VulkanCommandList {
    fn device(&self) -> &ash::Device {
        self.pool.ctx.device()
    }

    fn ensure_recording(&self) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(Error::BackendError("Command list not recording".to_string()))
        }
    }

    fn ensure_in_render_pass(&self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            Ok(())
        } else {
            Err(Error::BackendError("Not inside a render pass".to_string()))
        }
    }
}

impl CommandList for VulkanCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device()
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;
            self.device()
                .begin_command_buffer(self.command_buffer, &vk::CommandBufferBeginInfo::default())
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.device()
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        let vk_render_pass = render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("not a Vulkan render pass".to_string()))?;
        let vk_framebuffer = framebuffer
            .as_any()
            .downcast_ref::<VulkanFramebuffer>()
            .ok_or_else(|| Error::InvalidResource("not a Vulkan framebuffer".to_string()))?;

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|cv| match cv {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue { float32: color.to_array() },
                },
            })
            .collect();

        let extent = framebuffer.extent();
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: extent.width, height: extent.height },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device()
                .cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        }
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_in_render_pass()?;
        unsafe {
            self.device().cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording()?;
        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);
        unsafe {
            self.device().cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording()?;
        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });
        unsafe {
            self.device().cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()> {
        self.ensure_recording()?;
        let vk_pipeline = pipeline
            .as_any()
            .downcast_ref::<VulkanPipeline>()
            .ok_or_else(|| Error::InvalidResource("not a Vulkan pipeline".to_string()))?;

        unsafe {
            let device = self.device();
            device.cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, vk_pipeline.pipeline);
            // Every pipeline declares the engine vertex layout at binding 0
            device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[self.vertex_buffer.buffer], &[0]);
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        self.ensure_in_render_pass()?;
        unsafe {
            self.device().cmd_draw(self.command_buffer, vertex_count, instance_count, first_vertex, first_instance);
        }
        Ok(())
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            self.pool.ctx.device().free_command_buffers(self.pool.pool, &[self.command_buffer]);
        }
    }
}
