//! Window collaborator backed by winit
//!
//! The renderer polls the window once per frame, so events are pumped with a
//! zero timeout instead of handing control to `EventLoop::run_app`.

use std::time::Duration;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use thinframe_engine::thinframe::render::Extent2D;
use thinframe_engine::thinframe::{Error, RendererId, Result, Window};
use thinframe_engine::{engine_debug, engine_info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, WindowAttributes, WindowId};

#[derive(Debug, Clone)]
pub struct WindowDesc {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    /// Borderless on the current monitor
    pub fullscreen: bool,
    pub maximized: bool,
}

impl Default for WindowDesc {
    fn default() -> Self {
        Self {
            title: "Thinframe".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
            fullscreen: false,
            maximized: false,
        }
    }
}

impl WindowDesc {
    fn attributes(&self) -> WindowAttributes {
        let fullscreen = self.fullscreen.then_some(Fullscreen::Borderless(None));
        winit::window::Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
            .with_maximized(self.maximized)
            .with_fullscreen(fullscreen)
    }
}

/// State mutated by the event handler
struct WindowState {
    desc: WindowDesc,
    window: Option<winit::window::Window>,
    active: bool,
    resized: Option<Extent2D>,
    creation_error: Option<String>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.desc.attributes()) {
            Ok(window) => self.window = Some(window),
            Err(e) => {
                self.creation_error = Some(e.to_string());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.active = false;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.resized = Some(Extent2D::new(size.width, size.height));
            }
            _ => {}
        }
    }
}

pub struct WinitWindow {
    // Declared first so the window is released before its event loop
    state: WindowState,
    event_loop: EventLoop<()>,
}

impl WinitWindow {
    /// Open a window and pump events until the platform hands it out
    pub fn new(desc: WindowDesc) -> Result<Self> {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::InitializationFailed(format!("Cannot create event loop: {}", e)))?;
        let mut window = Self {
            state: WindowState {
                desc,
                window: None,
                active: true,
                resized: None,
                creation_error: None,
            },
            event_loop,
        };

        while window.state.window.is_none() {
            if let PumpStatus::Exit(_) = window.pump(Some(Duration::from_millis(10))) {
                let reason = window
                    .state
                    .creation_error
                    .take()
                    .unwrap_or_else(|| "event loop exited".to_string());
                return Err(Error::InitializationFailed(format!("Cannot create window: {}", reason)));
            }
        }

        engine_info!(
            "thinframe::demo",
            "Window '{}' opened ({}x{})",
            window.state.desc.title,
            window.extent().width,
            window.extent().height
        );
        Ok(window)
    }

    fn pump(&mut self, timeout: Option<Duration>) -> PumpStatus {
        self.event_loop.pump_app_events(timeout, &mut self.state)
    }
}

impl Window for WinitWindow {
    fn active(&self) -> bool {
        self.state.active
    }

    fn update(&mut self) {
        if let PumpStatus::Exit(_) = self.pump(Some(Duration::ZERO)) {
            self.state.active = false;
        }
    }

    fn extent(&self) -> Extent2D {
        self.state
            .window
            .as_ref()
            .map(|w| {
                let size = w.inner_size();
                Extent2D::new(size.width, size.height)
            })
            .unwrap_or_default()
    }

    fn take_resize(&mut self) -> Option<Extent2D> {
        self.state.resized.take()
    }

    fn on_renderer_attached(&mut self, renderer: RendererId) {
        engine_debug!("thinframe::demo", "{} attached", renderer);
    }

    fn on_renderer_detached(&mut self, renderer: RendererId) {
        engine_debug!("thinframe::demo", "{} detached", renderer);
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.state.window.as_ref().ok_or(HandleError::Unavailable)?.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.event_loop.display_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_desc_is_windowed() {
        let attributes = WindowDesc::default().attributes();
        assert!(attributes.fullscreen.is_none());
        assert!(!attributes.maximized);
        assert!(attributes.resizable);
        assert_eq!(attributes.title, "Thinframe");
    }

    #[test]
    fn test_fullscreen_desc_is_borderless() {
        let desc = WindowDesc { fullscreen: true, ..WindowDesc::default() };
        let attributes = desc.attributes();
        assert!(matches!(attributes.fullscreen, Some(Fullscreen::Borderless(None))));
        assert!(!attributes.maximized);
    }

    #[test]
    fn test_maximized_desc() {
        let desc = WindowDesc { maximized: true, resizable: false, ..WindowDesc::default() };
        let attributes = desc.attributes();
        assert!(attributes.maximized);
        assert!(!attributes.resizable);
        assert!(attributes.fullscreen.is_none());
    }
}
