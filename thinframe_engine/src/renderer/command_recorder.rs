//! Command recorder - one primary command list per swapchain image
//!
//! A list is re-recorded when the pipeline set or the presentation chain
//! changed since it was last recorded, and left alone otherwise. Each list
//! keeps `Arc`s to the pipelines it references until its next recording.

use std::sync::Arc;
use glam::Vec4;

use crate::error::{Error, FrameError, Result};
use crate::graphics_device::{
    ClearValue, CommandList, CommandPool, Framebuffer, GraphicsDevice, Rect2D, Viewport,
};
use crate::renderer::{GraphicsPipeline, PipelineRegistry, PresentationChain};

/// Vertices per draw; geometry comes from the shader
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Cache key of a recorded list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordedState {
    revision: u64,
    chain_generation: u64,
}

struct ImageCommands {
    recorded: Option<RecordedState>,
    pipelines: Vec<Arc<GraphicsPipeline>>,
}

pub struct CommandRecorder {
    images: Vec<ImageCommands>,
    // Lists are dropped before the pool they come from
    lists: Vec<Box<dyn CommandList>>,
    pool: Box<dyn CommandPool>,
    clear_color: Vec4,
    recordings: u64,
}

impl CommandRecorder {
    pub fn new(device: &dyn GraphicsDevice, image_count: usize, clear_color: Vec4) -> Result<Self> {
        let mut pool = device.create_command_pool()?;
        let lists = pool.allocate(image_count)?;
        Ok(Self {
            images: (0..image_count).map(|_| ImageCommands { recorded: None, pipelines: Vec::new() }).collect(),
            lists,
            pool,
            clear_color,
            recordings: 0,
        })
    }

    /// Match a rebuilt chain's image count; every list must be re-recorded afterwards
    pub fn resize(&mut self, image_count: usize) -> Result<()> {
        if image_count > self.lists.len() {
            let extra = self.pool.allocate(image_count - self.lists.len())?;
            self.lists.extend(extra);
        } else {
            self.lists.truncate(image_count);
        }
        self.images.resize_with(image_count, || ImageCommands { recorded: None, pipelines: Vec::new() });
        self.invalidate();
        Ok(())
    }

    /// Forget every cached recording
    pub fn invalidate(&mut self) {
        for image in &mut self.images {
            image.recorded = None;
        }
    }

    pub fn image_count(&self) -> usize {
        self.lists.len()
    }

    /// Total number of recordings performed
    pub fn recordings(&self) -> u64 {
        self.recordings
    }

    /// Pipelines bound by the current recording of `image_index`
    pub fn recorded_pipeline_count(&self, image_index: usize) -> usize {
        self.images.get(image_index).map(|i| i.pipelines.len()).unwrap_or(0)
    }

    pub fn command_list(&self, image_index: usize) -> Option<&dyn CommandList> {
        self.lists.get(image_index).map(|l| l.as_ref())
    }

    /// Bring the list of `image_index` up to date with the live pipeline set
    ///
    /// The caller must make sure the GPU finished with that list's previous
    /// submission. Returns true when the list was re-recorded.
    pub fn record(
        &mut self,
        image_index: usize,
        chain: &PresentationChain,
        registry: &PipelineRegistry,
    ) -> Result<bool> {
        let snapshot = registry.snapshot()?;
        let state = RecordedState {
            revision: snapshot.revision,
            chain_generation: chain.generation(),
        };
        let image = self
            .images
            .get(image_index)
            .ok_or_else(|| Error::InvalidResource(format!("No command list for image {}", image_index)))?;
        if image.recorded == Some(state) {
            return Ok(false);
        }

        let framebuffer = chain
            .framebuffer(image_index)
            .ok_or_else(|| Error::InvalidResource(format!("No framebuffer for image {}", image_index)))?;
        let list = &mut self.lists[image_index];

        // A failed recording must not be mistaken for a valid one
        self.images[image_index].recorded = None;

        record_commands(list.as_mut(), chain, framebuffer, &snapshot.pipelines, self.clear_color)
            .map_err(|e| Error::Frame(FrameError::Record(e.to_string())))?;

        crate::engine_trace!(
            "thinframe::CommandRecorder",
            "Image {} recorded with {} pipelines (revision {})",
            image_index, snapshot.pipelines.len(), snapshot.revision
        );

        let image = &mut self.images[image_index];
        image.recorded = Some(state);
        image.pipelines = snapshot.pipelines;
        self.recordings += 1;
        Ok(true)
    }

    /// Drop every pipeline reference held by recorded lists
    pub fn release_pipelines(&mut self) {
        for image in &mut self.images {
            image.pipelines.clear();
            image.recorded = None;
        }
    }
}

fn record_commands(
    list: &mut dyn CommandList,
    chain: &PresentationChain,
    framebuffer: &dyn Framebuffer,
    pipelines: &[Arc<GraphicsPipeline>],
    clear_color: Vec4,
) -> Result<()> {
    let extent = chain.extent();
    list.begin()?;
    list.begin_render_pass(
        chain.render_pass().as_ref(),
        framebuffer,
        &[ClearValue::Color(clear_color)],
    )?;
    list.set_viewport(Viewport::from_extent(extent))?;
    list.set_scissor(Rect2D::from_extent(extent))?;
    for pipeline in pipelines {
        list.bind_pipeline(pipeline.pipeline())?;
        list.draw(TRIANGLE_VERTEX_COUNT, 1, 0, 0)?;
    }
    list.end_render_pass()?;
    list.end()
}

#[cfg(test)]
#[path = "command_recorder_tests.rs"]
mod tests;
