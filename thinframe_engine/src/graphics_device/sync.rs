//! Synchronization primitives and queue submissions

use crate::graphics_device::{AsAny, CommandList};

/// GPU-side ordering primitive between queue operations
pub trait Semaphore: AsAny + Send + Sync {}

/// CPU-observable completion primitive
pub trait Fence: AsAny + Send + Sync {}

/// One command list submitted to the graphics queue
///
/// Execution waits for `wait_semaphore` at the color-attachment-output stage,
/// then signals `signal_semaphore` and `fence` on completion.
pub struct Submission<'a> {
    pub command_list: &'a dyn CommandList,
    pub wait_semaphore: &'a dyn Semaphore,
    pub signal_semaphore: &'a dyn Semaphore,
    pub fence: &'a dyn Fence,
}
