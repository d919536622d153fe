/*!
# Thinframe Engine - Vulkan Backend

Vulkan implementation of the `thinframe_engine` GPU boundary, built on Ash
for the bindings and gpu-allocator for memory.

`VulkanDeviceFactory` is the entry point: hand it to
`RendererContext::create` for any window that also exposes raw display and
window handles.

```no_run
use std::sync::Arc;
use thinframe_engine::thinframe::{Config, FileByteSupplier, RendererContext, Window};
use thinframe_engine_renderer_vulkan::VulkanDeviceFactory;
# fn run<W>(window: W) -> thinframe_engine::thinframe::Result<()>
# where W: Window + raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle {
let mut renderer = RendererContext::new(window, Arc::new(FileByteSupplier::new(".")), Config::default());
renderer.create(&VulkanDeviceFactory::new())?;
renderer.create_default_shader()?;
while renderer.window().active() {
    renderer.window_mut().update();
    renderer.draw()?;
}
renderer.destroy();
# Ok(())
# }
```

Validation layers are compiled in only with the `vulkan-validation` feature.
*/

mod vulkan;
mod vulkan_context;
mod vulkan_swapchain;
mod vulkan_render_target;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_command_list;
mod vulkan_sync;
mod vulkan_buffer;
mod debug;

pub use vulkan::{VulkanDeviceFactory, VulkanGraphicsDevice};
pub use vulkan_context::GpuContext;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
