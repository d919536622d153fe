//! Renderer context - owns every GPU object drawn into one window
//!
//! `create()` builds the stages in order:
//!
//! 1. Device
//! 2. Presentation chain
//! 3. Pipeline registry
//! 4. Command recorder
//! 5. Frame synchronization
//!
//! When a stage fails, the stages already built are released in reverse
//! order before the error is returned, so a failed `create()` leaves nothing
//! behind. `destroy()` releases everything in the same reverse order and is
//! idempotent. Dropping the context calls `destroy()`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::byte_supplier::ByteSupplier;
use crate::config::{Config, ShaderSpec};
use crate::error::{Error, FrameError, Result};
use crate::graphics_device::{DeviceFactory, DeviceInfo, Extent2D, GraphicsDevice};
use crate::renderer::{
    CommandRecorder, FrameStatus, FrameSubmitter, PipelineHandle, PipelineRegistry, PresentationChain,
};
use crate::window::Window;

static NEXT_RENDERER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique renderer id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RendererId(u64);

impl RendererId {
    fn next() -> Self {
        Self(NEXT_RENDERER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RendererId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "renderer#{}", self.0)
    }
}

/// Construction stages, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererStage {
    Device,
    PresentationChain,
    PipelineRegistry,
    CommandRecorder,
    FrameSync,
}

impl RendererStage {
    pub const ALL: [RendererStage; 5] = [
        RendererStage::Device,
        RendererStage::PresentationChain,
        RendererStage::PipelineRegistry,
        RendererStage::CommandRecorder,
        RendererStage::FrameSync,
    ];
}

impl fmt::Display for RendererStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RendererStage::Device => "device",
            RendererStage::PresentationChain => "presentation chain",
            RendererStage::PipelineRegistry => "pipeline registry",
            RendererStage::CommandRecorder => "command recorder",
            RendererStage::FrameSync => "frame synchronization",
        };
        f.write_str(name)
    }
}

/// Counters reported by `RendererContext::stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub frames_presented: u64,
    pub frames_skipped: u64,
    pub pipelines: usize,
    pub swapchain_images: usize,
    pub chain_rebuilds: u64,
}

pub struct RendererContext<W: Window> {
    id: RendererId,
    window: W,
    supplier: Arc<dyn ByteSupplier>,
    config: Config,

    device: Option<Arc<dyn GraphicsDevice>>,
    chain: Option<PresentationChain>,
    registry: Option<Arc<PipelineRegistry>>,
    recorder: Option<CommandRecorder>,
    submitter: Option<FrameSubmitter>,

    active: bool,
    needs_rebuild: bool,
    chain_generation: u64,
    chain_rebuilds: u64,
    frames_skipped: u64,
}

impl<W: Window> RendererContext<W> {
    /// Wrap a window; no GPU object exists until `create()`
    pub fn new(window: W, supplier: Arc<dyn ByteSupplier>, config: Config) -> Self {
        Self {
            id: RendererId::next(),
            window,
            supplier,
            config,
            device: None,
            chain: None,
            registry: None,
            recorder: None,
            submitter: None,
            active: false,
            needs_rebuild: false,
            chain_generation: 0,
            chain_rebuilds: 0,
            frames_skipped: 0,
        }
    }

    // ===== LIFECYCLE =====

    /// Build every stage, or none of them
    ///
    /// # Errors
    ///
    /// The error of the first failing stage. `Error::DeviceCreationFailed` is
    /// fatal; the entry point is expected to pass it to `Engine::fatal`.
    pub fn create(&mut self, factory: &dyn DeviceFactory<W>) -> Result<()> {
        if self.active {
            return Err(Error::InitializationFailed(format!("{} is already created", self.id)));
        }

        if let Err((stage, error)) = self.create_stages(factory) {
            crate::engine_error!(
                "thinframe::Renderer",
                "{}: {} creation failed: {}",
                self.id, stage, error
            );
            self.release_stages();
            return Err(error);
        }

        self.active = true;
        self.needs_rebuild = false;
        self.window.on_renderer_attached(self.id);

        if let Some(device) = &self.device {
            let info = device.info();
            crate::engine_info!(
                "thinframe::Renderer",
                "{} created on '{}' ({}), {} swapchain images",
                self.id,
                info.name,
                info.backend,
                self.chain.as_ref().map(|c| c.image_count()).unwrap_or(0)
            );
        }
        Ok(())
    }

    fn create_stages(
        &mut self,
        factory: &dyn DeviceFactory<W>,
    ) -> std::result::Result<(), (RendererStage, Error)> {
        let device = factory
            .create_device(&self.window, &self.config)
            .map_err(|e| (RendererStage::Device, e))?;
        self.device = Some(device.clone());

        self.chain_generation += 1;
        let chain = PresentationChain::create(
            device.as_ref(),
            self.window.extent(),
            &self.config,
            self.chain_generation,
        )
        .map_err(|e| (RendererStage::PresentationChain, e))?;
        let image_count = chain.image_count();
        let render_pass = chain.render_pass().clone();
        self.chain = Some(chain);

        self.registry = Some(Arc::new(PipelineRegistry::new(
            device.clone(),
            self.supplier.clone(),
            render_pass,
            self.config.default_shader.clone(),
        )));

        let recorder = CommandRecorder::new(device.as_ref(), image_count, self.config.clear_color)
            .map_err(|e| (RendererStage::CommandRecorder, e))?;
        self.recorder = Some(recorder);

        let submitter = FrameSubmitter::new(device.as_ref(), self.config.frames_in_flight(), image_count)
            .map_err(|e| (RendererStage::FrameSync, e))?;
        self.submitter = Some(submitter);
        Ok(())
    }

    /// Release whatever stages exist, last created first
    fn release_stages(&mut self) {
        if let Some(device) = &self.device {
            if let Err(e) = device.wait_idle() {
                crate::engine_warn!("thinframe::Renderer", "{}: wait idle before teardown failed: {}", self.id, e);
            }
        }

        self.submitter = None;
        if let Some(mut recorder) = self.recorder.take() {
            recorder.release_pipelines();
        }
        if let Some(registry) = self.registry.take() {
            registry.clear();
        }
        self.chain = None;
        self.device = None;
    }

    /// Release every GPU object; no-op when nothing was created
    pub fn destroy(&mut self) {
        let was_active = self.active;
        self.release_stages();
        self.active = false;
        self.needs_rebuild = false;

        if was_active {
            self.window.on_renderer_detached(self.id);
            crate::engine_info!("thinframe::Renderer", "{} destroyed", self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn id(&self) -> RendererId {
        self.id
    }

    /// True when `stage` currently holds its GPU objects
    pub fn has_stage(&self, stage: RendererStage) -> bool {
        match stage {
            RendererStage::Device => self.device.is_some(),
            RendererStage::PresentationChain => self.chain.is_some(),
            RendererStage::PipelineRegistry => self.registry.is_some(),
            RendererStage::CommandRecorder => self.recorder.is_some(),
            RendererStage::FrameSync => self.submitter.is_some(),
        }
    }

    pub fn completed_stages(&self) -> Vec<RendererStage> {
        RendererStage::ALL.into_iter().filter(|s| self.has_stage(*s)).collect()
    }

    // ===== FRAME =====

    /// Draw one frame
    ///
    /// Polls the window for a resize, rebuilds the presentation chain when it
    /// is stale, then runs acquire, submit and present. A window with no
    /// drawable area skips the frame.
    ///
    /// # Errors
    ///
    /// `Error::Frame` for a failed chain rebuild, acquire, record, submit or
    /// present; these are never fatal and the next `draw()` may succeed.
    pub fn draw(&mut self) -> Result<FrameStatus> {
        if !self.active {
            return Err(Error::InitializationFailed(format!("{} is not created", self.id)));
        }

        if let Some(extent) = self.window.take_resize() {
            crate::engine_debug!(
                "thinframe::Renderer",
                "{}: window resized to {}x{}",
                self.id, extent.width, extent.height
            );
            self.needs_rebuild = true;
        }

        if self.window.extent().is_zero_area() {
            self.frames_skipped += 1;
            return Ok(FrameStatus::Skipped);
        }

        if self.needs_rebuild {
            self.rebuild_presentation_chain().map_err(|e| match e {
                Error::Frame(_) => e,
                other => Error::Frame(FrameError::Rebuild(other.to_string())),
            })?;
        }

        let (Some(device), Some(chain), Some(registry), Some(recorder), Some(submitter)) = (
            &self.device,
            &mut self.chain,
            &self.registry,
            &mut self.recorder,
            &mut self.submitter,
        ) else {
            return Err(Error::InitializationFailed(format!("{} is missing a stage", self.id)));
        };

        let status = submitter.draw_frame(device.as_ref(), chain, recorder, registry)?;
        if status.needs_rebuild() {
            self.needs_rebuild = true;
        }
        Ok(status)
    }

    /// Replace the presentation chain with one matching the window's size
    ///
    /// Waits for the device to go idle first. Every command list is
    /// re-recorded on its next use.
    pub fn rebuild_presentation_chain(&mut self) -> Result<()> {
        let device = self
            .device
            .clone()
            .ok_or_else(|| Error::InitializationFailed(format!("{} is not created", self.id)))?;

        let extent = self.window.extent();
        if extent.is_zero_area() {
            self.needs_rebuild = true;
            return Ok(());
        }

        device.wait_idle()?;
        // The old swapchain must be gone before the surface gets a new one
        self.chain = None;
        self.needs_rebuild = true;

        let generation = self.chain_generation + 1;
        let chain = PresentationChain::create(device.as_ref(), extent, &self.config, generation)?;
        let image_count = chain.image_count();
        // The surface may clamp the requested size
        let chain_extent = chain.extent();

        if let Some(registry) = &self.registry {
            registry.set_render_pass(chain.render_pass().clone())?;
        }
        if let Some(recorder) = &mut self.recorder {
            recorder.resize(image_count)?;
        }
        if let Some(submitter) = &mut self.submitter {
            submitter.resize_images(device.as_ref(), image_count)?;
        }

        self.chain = Some(chain);
        self.chain_generation = generation;
        self.chain_rebuilds += 1;
        self.needs_rebuild = false;

        crate::engine_debug!(
            "thinframe::Renderer",
            "{}: presentation chain rebuilt ({} images, {}x{})",
            self.id, image_count, chain_extent.width, chain_extent.height
        );
        Ok(())
    }

    // ===== PIPELINES =====

    /// Shared handle on the pipeline registry, usable from other threads
    pub fn pipelines(&self) -> Result<Arc<PipelineRegistry>> {
        self.registry
            .clone()
            .ok_or_else(|| Error::InitializationFailed(format!("{} has no pipeline registry", self.id)))
    }

    pub fn create_shader(&self, spec: &ShaderSpec) -> Result<PipelineHandle> {
        self.pipelines()?.create_shader(spec)
    }

    pub fn destroy_shader(&self, handle: PipelineHandle) -> Result<()> {
        self.pipelines()?.destroy_shader(handle)
    }

    pub fn create_default_shader(&self) -> Result<PipelineHandle> {
        self.pipelines()?.create_default_shader()
    }

    // ===== ACCESSORS =====

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.device.as_ref().map(|d| d.info())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Size of the current presentation chain's images
    pub fn chain_extent(&self) -> Option<Extent2D> {
        self.chain.as_ref().map(|c| c.extent())
    }

    pub fn stats(&self) -> RendererStats {
        RendererStats {
            frames_presented: self.submitter.as_ref().map(|s| s.frames_presented()).unwrap_or(0),
            frames_skipped: self.frames_skipped,
            pipelines: self.registry.as_ref().map(|r| r.pipeline_count()).unwrap_or(0),
            swapchain_images: self.chain.as_ref().map(|c| c.image_count()).unwrap_or(0),
            chain_rebuilds: self.chain_rebuilds,
        }
    }
}

impl<W: Window> Drop for RendererContext<W> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "renderer_context_tests.rs"]
mod tests;
