/// Buffer - host-visible vertex buffer allocated through gpu-allocator

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;
use thinframe_engine::engine_err;
use thinframe_engine::glam::Vec3;
use thinframe_engine::thinframe::render::Vertex;
use thinframe_engine::thinframe::{Error, Result};

use crate::vulkan_context::GpuContext;

/// Triangle drawn by every pipeline, in clockwise order on screen
pub(crate) const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: Vec3::new(0.0, -0.5, 0.0),
        color: Vec3::new(1.0, 0.0, 0.0),
    },
    Vertex {
        position: Vec3::new(0.5, 0.5, 0.0),
        color: Vec3::new(0.0, 1.0, 0.0),
    },
    Vertex {
        position: Vec3::new(-0.5, 0.5, 0.0),
        color: Vec3::new(0.0, 0.0, 1.0),
    },
];

pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl Buffer {
    /// Create a vertex buffer holding `vertices`
    pub(crate) fn new_vertex(ctx: Arc<GpuContext>, vertices: &[Vertex]) -> Result<Self> {
        let data: &[u8] = bytemuck::cast_slice(vertices);
        let size = data.len() as u64;

        unsafe {
            let device = ctx.device();
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = device
                .create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("thinframe::vulkan", "Failed to create vertex buffer: {:?}", e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "thinframe vertex buffer",
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| engine_err!("thinframe::vulkan", "Failed to allocate vertex buffer memory: {:?}", e))
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            // From here on, Drop releases both the buffer and the allocation
            let mut vertex_buffer = Self { ctx: ctx.clone(), buffer, allocation: Some(allocation), size };
            if let Some(allocation) = &vertex_buffer.allocation {
                device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("thinframe::vulkan", "Failed to bind vertex buffer memory: {:?}", e))?;
            }
            vertex_buffer.write(0, data)?;
            Ok(vertex_buffer)
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copy `data` into the mapped memory at `offset`
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            return Err(Error::InvalidResource(format!(
                "Write of {} bytes at {} exceeds buffer size {}",
                data.len(),
                offset,
                self.size
            )));
        }
        let allocation = self
            .allocation
            .as_mut()
            .ok_or_else(|| Error::BackendError("Buffer has no allocation".to_string()))?;
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?;
        let start = offset as usize;
        mapped[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device().destroy_buffer(self.buffer, None);
        }
    }
}
