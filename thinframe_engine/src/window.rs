//! Window collaborator trait
//!
//! The renderer never creates or polls a platform window itself. It drives a
//! `Window` implementation supplied by the application.

use crate::graphics_device::Extent2D;
use crate::renderer::RendererId;

pub trait Window {
    /// False once the user asked to close the window
    fn active(&self) -> bool;

    /// Poll platform events and refresh the active flag
    fn update(&mut self);

    /// Current drawable size in pixels
    fn extent(&self) -> Extent2D;

    /// Returns the new size if the window was resized since the last call
    fn take_resize(&mut self) -> Option<Extent2D>;

    /// Called when a renderer starts drawing into this window
    fn on_renderer_attached(&mut self, _renderer: RendererId) {}

    /// Called when that renderer has released every GPU object tied to the window
    fn on_renderer_detached(&mut self, _renderer: RendererId) {}
}
