/// Semaphores and fences

use ash::vk;
use std::sync::Arc;
use thinframe_engine::engine_err;
use thinframe_engine::thinframe::render::{Fence, Semaphore};
use thinframe_engine::thinframe::{Error, Result};

use crate::vulkan_context::GpuContext;

pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let semaphore = unsafe {
            ctx.device()
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Self { ctx, semaphore })
    }
}

impl Semaphore for VulkanSemaphore {}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_semaphore(self.semaphore, None);
        }
    }
}

pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = unsafe {
            ctx.device()
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create fence: {:?}", e))?
        };
        Ok(Self { ctx, fence })
    }
}

impl Fence for VulkanFence {}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_fence(self.fence, None);
        }
    }
}

pub(crate) fn vk_semaphore(semaphore: &dyn Semaphore) -> Result<vk::Semaphore> {
    semaphore
        .as_any()
        .downcast_ref::<VulkanSemaphore>()
        .map(|s| s.semaphore)
        .ok_or_else(|| Error::InvalidResource("not a Vulkan semaphore".to_string()))
}

pub(crate) fn vk_fence(fence: &dyn Fence) -> Result<vk::Fence> {
    fence
        .as_any()
        .downcast_ref::<VulkanFence>()
        .map(|f| f.fence)
        .ok_or_else(|| Error::InvalidResource("not a Vulkan fence".to_string()))
}
