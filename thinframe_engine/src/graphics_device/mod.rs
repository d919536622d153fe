//! Graphics device module - the GPU boundary of the engine
//!
//! Every GPU object is an opaque trait object released on drop. Backends
//! recover their concrete types through `AsAny` when one object is handed
//! back to another (a render pass to a framebuffer, a pipeline to a command list).

pub mod graphics_device;
pub mod swapchain;
pub mod render_target;
pub mod render_pass;
pub mod frame_buffer;
pub mod shader;
pub mod pipeline;
pub mod command_list;
pub mod sync;

pub use graphics_device::*;
pub use swapchain::*;
pub use render_target::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use command_list::*;
pub use sync::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
