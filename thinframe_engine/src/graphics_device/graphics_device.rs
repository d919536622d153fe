//! GraphicsDevice trait - factory for every GPU object

use std::any::Any;
use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::graphics_device::{
    Swapchain, SwapchainDesc, RenderPass, RenderPassDesc, Framebuffer, FramebufferDesc,
    Shader, ShaderDesc, Pipeline, PipelineDesc, CommandPool, Semaphore, Fence, Submission,
};

/// Downcasting support for GPU objects
///
/// Implemented for every sized `'static` type. Call it on a `&dyn Trait`,
/// never on an `Arc`/`Box` holding one.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Description of the device a backend selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable adapter name
    pub name: String,
    /// Backend identifier ("vulkan", "mock")
    pub backend: &'static str,
    pub graphics_queue_family: u32,
    pub present_queue_family: u32,
}

impl DeviceInfo {
    /// True when graphics and presentation share one queue family
    pub fn shared_queue_family(&self) -> bool {
        self.graphics_queue_family == self.present_queue_family
    }
}

/// Logical GPU connection: queues, allocator and object factory
///
/// All methods take `&self`: backends synchronize their own queue access, so a
/// device can be shared between the presentation chain, the pipeline registry
/// and the frame submitter.
pub trait GraphicsDevice: AsAny + Send + Sync {
    fn info(&self) -> DeviceInfo;

    /// Create a swapchain for the surface the device was created against
    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Box<dyn Framebuffer>>;

    /// Compile bytecode into a shader module
    ///
    /// # Errors
    ///
    /// `Error::ModuleCompile` when the bytecode is malformed.
    fn create_shader(&self, desc: &ShaderDesc) -> Result<Box<dyn Shader>>;

    /// Build a graphics pipeline and its layout
    ///
    /// # Errors
    ///
    /// `Error::PipelineCreation` when the pipeline or its layout cannot be built.
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Box<dyn Pipeline>>;

    fn create_command_pool(&self) -> Result<Box<dyn CommandPool>>;

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>>;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    /// Block until `fence` is signaled
    fn wait_for_fence(&self, fence: &dyn Fence) -> Result<()>;

    fn reset_fence(&self, fence: &dyn Fence) -> Result<()>;

    /// Submit one command list to the graphics queue
    fn submit(&self, submission: &Submission) -> Result<()>;

    /// Block until every queue of the device is idle
    fn wait_idle(&self) -> Result<()>;
}

/// Creates the device for a given window
///
/// Implemented by backends. A failure here is fatal for the renderer, and
/// implementations report it as `Error::DeviceCreationFailed`.
pub trait DeviceFactory<W: ?Sized> {
    fn create_device(&self, window: &W, config: &Config) -> Result<Arc<dyn GraphicsDevice>>;
}
