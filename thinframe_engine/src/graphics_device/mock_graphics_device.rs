//! Mock graphics device for unit tests (no GPU required)
//!
//! Every call is recorded as a `MockEvent` in state shared by all objects the
//! device creates. The mock also enforces the synchronization rules a real
//! driver would: a semaphore must be signaled before it is waited on, a fence
//! must be signaled before it is waited on and unsignaled when submitted, and
//! a command list must be fully recorded before submission. Breaking one of
//! these rules returns an error instead of hanging or corrupting a frame.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::Config;
use crate::engine_bail;
use crate::error::{Error, FrameError, Result};
use crate::graphics_device::{
    choose_image_count, AcquireOutcome, CommandList, CommandPool, ClearValue, DeviceFactory,
    DeviceInfo, Extent2D, Fence, Framebuffer, FramebufferDesc, GraphicsDevice, Pipeline,
    PipelineDesc, PresentMode, PresentOutcome, Rect2D, RenderPass, RenderPassDesc, RenderTarget,
    Semaphore, Shader, ShaderDesc, ShaderStage, Submission, Swapchain, SwapchainDesc,
    TextureFormat, Viewport, validate_spirv, SPIRV_MAGIC,
};

// ============================================================================
// Events and failure injection
// ============================================================================

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    CreateDevice,
    CreateSwapchain { image_count: usize, extent: Extent2D },
    CreateImageView(usize),
    CreateRenderPass,
    CreateFramebuffer(usize),
    CreateShader(ShaderStage),
    CreatePipeline(u64),
    CreateCommandPool,
    AllocateCommandLists(usize),
    CreateSemaphore,
    CreateFence { signaled: bool },

    Begin(u64),
    BeginRenderPass { list: u64, image: usize, clear: ClearValue },
    SetViewport(u64),
    SetScissor(u64),
    BindPipeline { list: u64, pipeline: u64 },
    Draw { list: u64, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32 },
    EndRenderPass(u64),
    End(u64),

    Acquire(u32),
    AcquireOutOfDate,
    WaitFence(u64),
    ResetFence(u64),
    Submit { list: u64, fence: u64 },
    Present(u32),
    WaitIdle,

    /// An object of the given kind was dropped
    Release(&'static str),
}

/// Device calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    Device,
    Swapchain,
    ImageView,
    RenderPass,
    Framebuffer,
    Shader,
    Pipeline,
    CommandPool,
    Semaphore,
    Fence,
    Acquire,
    Submit,
    Present,
}

/// Surface capabilities reported by the mock
#[derive(Debug, Clone, Copy)]
pub struct MockSurface {
    pub min_image_count: u32,
    pub max_image_count: u32,
    pub current_extent: Extent2D,
}

impl Default for MockSurface {
    fn default() -> Self {
        Self {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: Extent2D::new(800, 600),
        }
    }
}

#[derive(Default)]
struct MockState {
    events: Vec<MockEvent>,
    live: FxHashMap<&'static str, i64>,
    failures: FxHashSet<MockFailure>,
    acquire_script: VecDeque<AcquireOutcome>,
    present_script: VecDeque<PresentOutcome>,
    surface: MockSurface,
    next_handle: u64,
    shader_compilations: usize,
}

// ============================================================================
// MockGpu - shared state handle used by tests
// ============================================================================

/// Handle on the state shared by a mock device and everything it created
#[derive(Clone, Default)]
pub struct MockGpu {
    state: Arc<Mutex<MockState>>,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn push(&self, event: MockEvent) {
        self.lock().events.push(event);
    }

    fn next_handle(&self) -> u64 {
        let mut state = self.lock();
        state.next_handle += 1;
        state.next_handle
    }

    fn token(&self, kind: &'static str) -> LiveToken {
        *self.lock().live.entry(kind).or_insert(0) += 1;
        LiveToken { gpu: self.clone(), kind }
    }

    fn fails(&self, failure: MockFailure) -> bool {
        self.lock().failures.contains(&failure)
    }

    /// Device creation through `DeviceFactory`
    pub fn factory(&self) -> MockDeviceFactory {
        MockDeviceFactory { gpu: self.clone() }
    }

    /// Device created directly, bypassing failure injection
    pub fn device(&self) -> Arc<dyn GraphicsDevice> {
        self.push(MockEvent::CreateDevice);
        Arc::new(MockGraphicsDevice { _live: self.token("device"), gpu: self.clone() })
    }

    // ===== failure injection / scripting =====

    pub fn fail(&self, failure: MockFailure) {
        self.lock().failures.insert(failure);
    }

    pub fn recover(&self, failure: MockFailure) {
        self.lock().failures.remove(&failure);
    }

    pub fn script_acquire(&self, outcome: AcquireOutcome) {
        self.lock().acquire_script.push_back(outcome);
    }

    pub fn script_present(&self, outcome: PresentOutcome) {
        self.lock().present_script.push_back(outcome);
    }

    pub fn set_surface(&self, surface: MockSurface) {
        self.lock().surface = surface;
    }

    // ===== inspection =====

    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Number of live objects of `kind`
    pub fn live(&self, kind: &str) -> i64 {
        self.lock().live.get(kind).copied().unwrap_or(0)
    }

    /// Number of live objects of any kind
    pub fn total_live(&self) -> i64 {
        self.lock().live.values().sum()
    }

    pub fn shader_compilations(&self) -> usize {
        self.lock().shader_compilations
    }

    /// Count events matching `pred`
    pub fn count(&self, pred: impl Fn(&MockEvent) -> bool) -> usize {
        self.lock().events.iter().filter(|e| pred(*e)).count()
    }

    /// Commands of the most recent recording of `list`, from `Begin` to `End`
    pub fn last_recording(&self, list: u64) -> Vec<MockEvent> {
        let events = self.events();
        let start = events.iter().rposition(|e| *e == MockEvent::Begin(list));
        match start {
            Some(start) => {
                let mut out = Vec::new();
                for event in &events[start..] {
                    if mock_command_list_of(event) == Some(list) {
                        out.push(event.clone());
                        if *event == MockEvent::End(list) {
                            break;
                        }
                    }
                }
                out
            }
            None => Vec::new(),
        }
    }
}

fn mock_command_list_of(event: &MockEvent) -> Option<u64> {
    match event {
        MockEvent::Begin(l)
        | MockEvent::SetViewport(l)
        | MockEvent::SetScissor(l)
        | MockEvent::EndRenderPass(l)
        | MockEvent::End(l) => Some(*l),
        MockEvent::BeginRenderPass { list, .. }
        | MockEvent::BindPipeline { list, .. }
        | MockEvent::Draw { list, .. } => Some(*list),
        _ => None,
    }
}

/// Valid 20-byte SPIR-V header accepted by the mock compiler
pub fn mock_spirv() -> Vec<u8> {
    let mut code = Vec::new();
    for word in [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0] {
        code.extend_from_slice(&word.to_le_bytes());
    }
    code
}

/// Decrements the live count of its kind on drop
struct LiveToken {
    gpu: MockGpu,
    kind: &'static str,
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        if let Ok(mut state) = self.gpu.state.lock() {
            *state.live.entry(self.kind).or_insert(0) -= 1;
            state.events.push(MockEvent::Release(self.kind));
        }
    }
}

// ============================================================================
// Factory and device
// ============================================================================

pub struct MockDeviceFactory {
    gpu: MockGpu,
}

impl<W: ?Sized> DeviceFactory<W> for MockDeviceFactory {
    fn create_device(&self, _window: &W, _config: &Config) -> Result<Arc<dyn GraphicsDevice>> {
        if self.gpu.fails(MockFailure::Device) {
            return Err(Error::DeviceCreationFailed("No suitable mock GPU".to_string()));
        }
        Ok(self.gpu.device())
    }
}

pub struct MockGraphicsDevice {
    _live: LiveToken,
    gpu: MockGpu,
}

fn mock_semaphore(semaphore: &dyn Semaphore) -> Result<&MockSemaphore> {
    semaphore
        .as_any()
        .downcast_ref::<MockSemaphore>()
        .ok_or_else(|| Error::InvalidResource("not a mock semaphore".to_string()))
}

fn mock_fence(fence: &dyn Fence) -> Result<&MockFence> {
    fence
        .as_any()
        .downcast_ref::<MockFence>()
        .ok_or_else(|| Error::InvalidResource("not a mock fence".to_string()))
}

impl GraphicsDevice for MockGraphicsDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Mock GPU".to_string(),
            backend: "mock",
            graphics_queue_family: 0,
            present_queue_family: 0,
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        if self.gpu.fails(MockFailure::Swapchain) {
            engine_bail!("thinframe::mock", "Injected swapchain failure");
        }
        let surface = self.gpu.lock().surface;
        let image_count = choose_image_count(surface.min_image_count, surface.max_image_count) as usize;
        self.gpu.push(MockEvent::CreateSwapchain { image_count, extent: surface.current_extent });
        Ok(Box::new(MockSwapchain {
            _live: self.gpu.token("swapchain"),
            gpu: self.gpu.clone(),
            image_count,
            extent: surface.current_extent,
            format: desc.preferred_format,
            present_mode: desc.present_mode,
            next_image: 0,
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        if self.gpu.fails(MockFailure::RenderPass) {
            engine_bail!("thinframe::mock", "Injected render pass failure");
        }
        self.gpu.push(MockEvent::CreateRenderPass);
        Ok(Arc::new(MockRenderPass { _live: self.gpu.token("render_pass"), format: desc.color_format }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Box<dyn Framebuffer>> {
        if self.gpu.fails(MockFailure::Framebuffer) {
            engine_bail!("thinframe::mock", "Injected framebuffer failure");
        }
        let image = desc
            .color_attachment
            .as_any()
            .downcast_ref::<MockRenderTarget>()
            .map(|t| t.index)
            .ok_or_else(|| Error::InvalidResource("not a mock render target".to_string()))?;
        self.gpu.push(MockEvent::CreateFramebuffer(image));
        Ok(Box::new(MockFramebuffer { _live: self.gpu.token("framebuffer"), image, extent: desc.extent }))
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<Box<dyn Shader>> {
        if self.gpu.fails(MockFailure::Shader) {
            return Err(Error::ModuleCompile("Injected shader failure".to_string()));
        }
        validate_spirv(desc.code)?;
        self.gpu.lock().shader_compilations += 1;
        self.gpu.push(MockEvent::CreateShader(desc.stage));
        Ok(Box::new(MockShader {
            _live: self.gpu.token("shader"),
            stage: desc.stage,
            entry_point: desc.entry_point.to_string(),
        }))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Box<dyn Pipeline>> {
        if self.gpu.fails(MockFailure::Pipeline) {
            return Err(Error::PipelineCreation("Injected pipeline failure".to_string()));
        }
        if desc.vertex_shader.stage() != ShaderStage::Vertex
            || desc.fragment_shader.stage() != ShaderStage::Fragment
        {
            return Err(Error::PipelineCreation("Shader stages swapped".to_string()));
        }
        let handle = self.gpu.next_handle();
        self.gpu.push(MockEvent::CreatePipeline(handle));
        Ok(Box::new(MockPipeline { _live: self.gpu.token("pipeline"), handle }))
    }

    fn create_command_pool(&self) -> Result<Box<dyn CommandPool>> {
        if self.gpu.fails(MockFailure::CommandPool) {
            engine_bail!("thinframe::mock", "Injected command pool failure");
        }
        self.gpu.push(MockEvent::CreateCommandPool);
        Ok(Box::new(MockCommandPool { _live: self.gpu.token("command_pool"), gpu: self.gpu.clone() }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        if self.gpu.fails(MockFailure::Semaphore) {
            engine_bail!("thinframe::mock", "Injected semaphore failure");
        }
        self.gpu.push(MockEvent::CreateSemaphore);
        Ok(Box::new(MockSemaphore {
            _live: self.gpu.token("semaphore"),
            signaled: AtomicBool::new(false),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        if self.gpu.fails(MockFailure::Fence) {
            engine_bail!("thinframe::mock", "Injected fence failure");
        }
        let handle = self.gpu.next_handle();
        self.gpu.push(MockEvent::CreateFence { signaled });
        Ok(Box::new(MockFence {
            _live: self.gpu.token("fence"),
            handle,
            signaled: AtomicBool::new(signaled),
        }))
    }

    fn wait_for_fence(&self, fence: &dyn Fence) -> Result<()> {
        let fence = mock_fence(fence)?;
        if !fence.signaled.load(Ordering::SeqCst) {
            engine_bail!("thinframe::mock", "Waiting on a fence that was never submitted");
        }
        self.gpu.push(MockEvent::WaitFence(fence.handle));
        Ok(())
    }

    fn reset_fence(&self, fence: &dyn Fence) -> Result<()> {
        let fence = mock_fence(fence)?;
        fence.signaled.store(false, Ordering::SeqCst);
        self.gpu.push(MockEvent::ResetFence(fence.handle));
        Ok(())
    }

    fn submit(&self, submission: &Submission) -> Result<()> {
        if self.gpu.fails(MockFailure::Submit) {
            return Err(Error::Frame(FrameError::Submit("Injected submit failure".to_string())));
        }
        let list = submission
            .command_list
            .as_any()
            .downcast_ref::<MockCommandList>()
            .ok_or_else(|| Error::InvalidResource("not a mock command list".to_string()))?;
        if !list.executable {
            engine_bail!("thinframe::mock", "Submitting a command list that is not fully recorded");
        }
        let wait = mock_semaphore(submission.wait_semaphore)?;
        let signal = mock_semaphore(submission.signal_semaphore)?;
        let fence = mock_fence(submission.fence)?;
        if !wait.signaled.swap(false, Ordering::SeqCst) {
            engine_bail!("thinframe::mock", "Submission waits on a semaphore nobody signals");
        }
        if signal.signaled.swap(true, Ordering::SeqCst) {
            engine_bail!("thinframe::mock", "Submission signals a semaphore that is already signaled");
        }
        if fence.signaled.swap(true, Ordering::SeqCst) {
            engine_bail!("thinframe::mock", "Submission fence was not reset");
        }
        self.gpu.push(MockEvent::Submit { list: list.handle, fence: fence.handle });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.gpu.push(MockEvent::WaitIdle);
        Ok(())
    }
}

// ============================================================================
// Swapchain
// ============================================================================

pub struct MockSwapchain {
    _live: LiveToken,
    gpu: MockGpu,
    image_count: usize,
    extent: Extent2D,
    format: TextureFormat,
    present_mode: PresentMode,
    next_image: u32,
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome> {
        if self.gpu.fails(MockFailure::Acquire) {
            return Err(Error::Frame(FrameError::Acquire("Injected acquire failure".to_string())));
        }
        let scripted = self.gpu.lock().acquire_script.pop_front();
        let outcome = scripted.unwrap_or(AcquireOutcome::Ready {
            image_index: self.next_image,
            suboptimal: false,
        });
        match outcome {
            AcquireOutcome::Ready { image_index, .. } => {
                if image_index as usize >= self.image_count {
                    return Err(Error::InvalidResource(format!("image {} out of range", image_index)));
                }
                if mock_semaphore(signal)?.signaled.swap(true, Ordering::SeqCst) {
                    engine_bail!("thinframe::mock", "Acquire signals a semaphore that is already signaled");
                }
                self.next_image = (image_index + 1) % self.image_count as u32;
                self.gpu.push(MockEvent::Acquire(image_index));
            }
            AcquireOutcome::OutOfDate => self.gpu.push(MockEvent::AcquireOutOfDate),
        }
        Ok(outcome)
    }

    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        if self.gpu.fails(MockFailure::Present) {
            return Err(Error::Frame(FrameError::Present("Injected present failure".to_string())));
        }
        if !mock_semaphore(wait)?.signaled.swap(false, Ordering::SeqCst) {
            engine_bail!("thinframe::mock", "Present waits on a semaphore nobody signals");
        }
        self.gpu.push(MockEvent::Present(image_index));
        let scripted = self.gpu.lock().present_script.pop_front();
        Ok(scripted.unwrap_or(PresentOutcome::Presented))
    }

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    fn create_image_view(&self, index: usize) -> Result<Box<dyn RenderTarget>> {
        if self.gpu.fails(MockFailure::ImageView) {
            engine_bail!("thinframe::mock", "Injected image view failure");
        }
        if index >= self.image_count {
            return Err(Error::InvalidResource(format!("image {} out of range", index)));
        }
        self.gpu.push(MockEvent::CreateImageView(index));
        Ok(Box::new(MockRenderTarget {
            _live: self.gpu.token("image_view"),
            index,
            extent: self.extent,
            format: self.format,
        }))
    }
}

// ============================================================================
// Simple objects
// ============================================================================

pub struct MockRenderTarget {
    _live: LiveToken,
    index: usize,
    extent: Extent2D,
    format: TextureFormat,
}

impl RenderTarget for MockRenderTarget {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

pub struct MockRenderPass {
    _live: LiveToken,
    format: TextureFormat,
}

impl RenderPass for MockRenderPass {
    fn color_format(&self) -> TextureFormat {
        self.format
    }
}

pub struct MockFramebuffer {
    _live: LiveToken,
    image: usize,
    extent: Extent2D,
}

impl Framebuffer for MockFramebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }
}

pub struct MockShader {
    _live: LiveToken,
    stage: ShaderStage,
    entry_point: String,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

pub struct MockPipeline {
    _live: LiveToken,
    pub handle: u64,
}

impl Pipeline for MockPipeline {}

pub struct MockSemaphore {
    _live: LiveToken,
    signaled: AtomicBool,
}

impl Semaphore for MockSemaphore {}

pub struct MockFence {
    _live: LiveToken,
    pub handle: u64,
    signaled: AtomicBool,
}

impl Fence for MockFence {}

// ============================================================================
// Command pool / lists
// ============================================================================

pub struct MockCommandPool {
    _live: LiveToken,
    gpu: MockGpu,
}

impl CommandPool for MockCommandPool {
    fn allocate(&mut self, count: usize) -> Result<Vec<Box<dyn CommandList>>> {
        self.gpu.push(MockEvent::AllocateCommandLists(count));
        Ok((0..count)
            .map(|_| {
                Box::new(MockCommandList {
                    _live: self.gpu.token("command_list"),
                    gpu: self.gpu.clone(),
                    handle: self.gpu.next_handle(),
                    recording: false,
                    executable: false,
                    in_render_pass: false,
                    pipeline_bound: false,
                }) as Box<dyn CommandList>
            })
            .collect())
    }
}

pub struct MockCommandList {
    _live: LiveToken,
    gpu: MockGpu,
    pub handle: u64,
    recording: bool,
    executable: bool,
    in_render_pass: bool,
    pipeline_bound: bool,
}

impl MockCommandList {
    fn require_recording(&self, what: &str) -> Result<()> {
        if !self.recording {
            engine_bail!("thinframe::mock", "{} outside of recording", what);
        }
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("thinframe::mock", "begin called twice");
        }
        self.recording = true;
        self.executable = false;
        self.pipeline_bound = false;
        self.gpu.push(MockEvent::Begin(self.handle));
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        if self.in_render_pass {
            engine_bail!("thinframe::mock", "end called inside a render pass");
        }
        self.recording = false;
        self.executable = true;
        self.gpu.push(MockEvent::End(self.handle));
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.require_recording("begin_render_pass")?;
        let image = framebuffer
            .as_any()
            .downcast_ref::<MockFramebuffer>()
            .map(|f| f.image)
            .ok_or_else(|| Error::InvalidResource("not a mock framebuffer".to_string()))?;
        let clear = match clear_values {
            [clear] => *clear,
            _ => engine_bail!("thinframe::mock", "expected exactly one clear value"),
        };
        self.in_render_pass = true;
        self.gpu.push(MockEvent::BeginRenderPass { list: self.handle, image, clear });
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        if !self.in_render_pass {
            engine_bail!("thinframe::mock", "end_render_pass without begin");
        }
        self.in_render_pass = false;
        self.gpu.push(MockEvent::EndRenderPass(self.handle));
        Ok(())
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;
        self.gpu.push(MockEvent::SetViewport(self.handle));
        Ok(())
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.require_recording("set_scissor")?;
        self.gpu.push(MockEvent::SetScissor(self.handle));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()> {
        self.require_recording("bind_pipeline")?;
        let handle = pipeline
            .as_any()
            .downcast_ref::<MockPipeline>()
            .map(|p| p.handle)
            .ok_or_else(|| Error::InvalidResource("not a mock pipeline".to_string()))?;
        self.pipeline_bound = true;
        self.gpu.push(MockEvent::BindPipeline { list: self.handle, pipeline: handle });
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        if !self.in_render_pass || !self.pipeline_bound {
            engine_bail!("thinframe::mock", "draw without render pass or pipeline");
        }
        self.gpu.push(MockEvent::Draw {
            list: self.handle,
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
