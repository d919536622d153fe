//! Frame submitter - the acquire / submit / present cycle
//!
//! Synchronization state:
//! - a ring of `max_frames_in_flight` slots, each holding an image-available
//!   semaphore and an in-flight fence (created signaled)
//! - one render-finished semaphore per swapchain image, so a semaphore still
//!   waited on by the presentation engine is never signaled again early
//! - for each swapchain image, the slot that last rendered into it; that
//!   slot's fence is waited before the image's command list is re-recorded

use std::fmt;
use crate::error::{Error, FrameError, Result};
use crate::graphics_device::{
    AcquireOutcome, Fence, GraphicsDevice, PresentOutcome, Semaphore, Submission,
};
use crate::renderer::{CommandRecorder, PipelineRegistry, PresentationChain};

/// Per-frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Acquiring,
    Submitted,
    Presented,
}

/// What happened to a `draw` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was queued for display
    Presented,
    /// The frame was queued, but the chain should be rebuilt
    Suboptimal,
    /// Nothing was drawn; the chain must be rebuilt
    OutOfDate,
    /// Nothing was drawn because the window has no drawable area
    Skipped,
}

impl FrameStatus {
    /// True when the presentation chain should be rebuilt before the next frame
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, FrameStatus::Suboptimal | FrameStatus::OutOfDate)
    }
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FrameStatus::Presented => "presented",
            FrameStatus::Suboptimal => "suboptimal",
            FrameStatus::OutOfDate => "out of date",
            FrameStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

struct FrameSlot {
    image_available: Box<dyn Semaphore>,
    in_flight: Box<dyn Fence>,
}

pub struct FrameSubmitter {
    slots: Vec<FrameSlot>,
    render_finished: Vec<Box<dyn Semaphore>>,
    images_in_flight: Vec<Option<usize>>,
    current: usize,
    state: FrameState,
    frames_presented: u64,
}

impl FrameSubmitter {
    pub fn new(device: &dyn GraphicsDevice, frames_in_flight: usize, image_count: usize) -> Result<Self> {
        Ok(Self {
            slots: create_slots(device, frames_in_flight.max(1))?,
            render_finished: create_semaphores(device, image_count)?,
            images_in_flight: vec![None; image_count],
            current: 0,
            state: FrameState::Idle,
            frames_presented: 0,
        })
    }

    /// Recreate per-image state for a rebuilt chain
    ///
    /// The device must be idle.
    pub fn resize_images(&mut self, device: &dyn GraphicsDevice, image_count: usize) -> Result<()> {
        self.render_finished = create_semaphores(device, image_count)?;
        self.images_in_flight = vec![None; image_count];
        Ok(())
    }

    /// Replace every synchronization object after an abandoned frame
    ///
    /// A frame that failed halfway can leave a semaphore signaled with nobody
    /// waiting on it, or a fence reset with nothing submitted to signal it.
    fn reset_sync(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        device.wait_idle()?;
        self.slots = create_slots(device, self.slots.len())?;
        self.render_finished = create_semaphores(device, self.render_finished.len())?;
        self.images_in_flight.iter_mut().for_each(|slot| *slot = None);
        self.current = 0;
        Ok(())
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Ring slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Block until every submitted frame completed
    pub fn wait_all(&self, device: &dyn GraphicsDevice) -> Result<()> {
        for slot in &self.slots {
            device.wait_for_fence(slot.in_flight.as_ref())?;
        }
        Ok(())
    }

    /// Run one frame: acquire, record if needed, submit, present
    pub fn draw_frame(
        &mut self,
        device: &dyn GraphicsDevice,
        chain: &mut PresentationChain,
        recorder: &mut CommandRecorder,
        registry: &PipelineRegistry,
    ) -> Result<FrameStatus> {
        let result = self.run_frame(device, chain, recorder, registry);
        if let Err(e) = &result {
            crate::engine_warn!("thinframe::FrameSubmitter", "Frame abandoned in {:?} state: {}", self.state, e);
            if let Err(reset) = self.reset_sync(device) {
                crate::engine_error!("thinframe::FrameSubmitter", "Cannot reset frame synchronization: {}", reset);
            }
        }
        self.state = FrameState::Idle;
        result
    }

    fn run_frame(
        &mut self,
        device: &dyn GraphicsDevice,
        chain: &mut PresentationChain,
        recorder: &mut CommandRecorder,
        registry: &PipelineRegistry,
    ) -> Result<FrameStatus> {
        let current = self.current;

        self.state = FrameState::Acquiring;
        device
            .wait_for_fence(self.slots[current].in_flight.as_ref())
            .map_err(|e| Error::Frame(FrameError::Acquire(e.to_string())))?;

        let (image_index, acquire_suboptimal) =
            match chain.acquire_next_image(self.slots[current].image_available.as_ref())? {
                AcquireOutcome::Ready { image_index, suboptimal } => (image_index, suboptimal),
                AcquireOutcome::OutOfDate => {
                    crate::engine_debug!("thinframe::FrameSubmitter", "Swapchain out of date on acquire");
                    return Ok(FrameStatus::OutOfDate);
                }
            };
        let image = image_index as usize;
        if image >= self.images_in_flight.len() || image >= self.render_finished.len() {
            return Err(Error::Frame(FrameError::Acquire(format!(
                "Acquired image {} but only {} are tracked",
                image_index,
                self.images_in_flight.len()
            ))));
        }

        // Another slot may still be rendering into this image
        if let Some(previous) = self.images_in_flight[image] {
            if previous != current {
                device
                    .wait_for_fence(self.slots[previous].in_flight.as_ref())
                    .map_err(|e| Error::Frame(FrameError::Acquire(e.to_string())))?;
            }
        }
        self.images_in_flight[image] = Some(current);

        recorder.record(image, chain, registry)?;
        let command_list = recorder
            .command_list(image)
            .ok_or_else(|| Error::Frame(FrameError::Record(format!("No command list for image {}", image))))?;

        let slot = &self.slots[current];
        device
            .reset_fence(slot.in_flight.as_ref())
            .map_err(|e| Error::Frame(FrameError::Submit(e.to_string())))?;
        device
            .submit(&Submission {
                command_list,
                wait_semaphore: slot.image_available.as_ref(),
                signal_semaphore: self.render_finished[image].as_ref(),
                fence: slot.in_flight.as_ref(),
            })
            .map_err(|e| match e {
                Error::Frame(_) => e,
                other => Error::Frame(FrameError::Submit(other.to_string())),
            })?;
        self.state = FrameState::Submitted;

        let presented = chain
            .present(image_index, self.render_finished[image].as_ref())
            .map_err(|e| match e {
                Error::Frame(_) => e,
                other => Error::Frame(FrameError::Present(other.to_string())),
            })?;
        self.state = FrameState::Presented;
        self.current = (current + 1) % self.slots.len();
        self.frames_presented += 1;

        Ok(match presented {
            PresentOutcome::OutOfDate => FrameStatus::OutOfDate,
            PresentOutcome::Suboptimal => FrameStatus::Suboptimal,
            PresentOutcome::Presented if acquire_suboptimal => FrameStatus::Suboptimal,
            PresentOutcome::Presented => FrameStatus::Presented,
        })
    }
}

fn create_slots(device: &dyn GraphicsDevice, count: usize) -> Result<Vec<FrameSlot>> {
    (0..count)
        .map(|_| {
            Ok(FrameSlot {
                image_available: device.create_semaphore()?,
                in_flight: device.create_fence(true)?,
            })
        })
        .collect()
}

fn create_semaphores(device: &dyn GraphicsDevice, count: usize) -> Result<Vec<Box<dyn Semaphore>>> {
    (0..count).map(|_| device.create_semaphore()).collect()
}

#[cfg(test)]
#[path = "frame_submitter_tests.rs"]
mod tests;
