//! GPU tests for the Vulkan backend
//!
//! winit allows one event loop per process, so every scenario runs inside a
//! single test that shares it. Requires a GPU and a display.
//!
//! Run with: cargo test --test vulkan_renderer_tests -- --ignored

use std::sync::Arc;

use raw_window_handle::{DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle};
use thinframe_engine::thinframe::render::{DeviceFactory, Extent2D};
use thinframe_engine::thinframe::{
    Config, Error, FrameStatus, MemoryByteSupplier, RendererContext, RendererStage, ShaderSpec, Window,
};
use thinframe_engine_renderer_vulkan::VulkanDeviceFactory;
use winit::event_loop::EventLoop;

/// Hidden window that stays active for a fixed number of frames
struct TestWindow {
    window: winit::window::Window,
    frames_left: usize,
}

impl Window for TestWindow {
    fn active(&self) -> bool {
        self.frames_left > 0
    }

    fn update(&mut self) {
        self.frames_left = self.frames_left.saturating_sub(1);
    }

    fn extent(&self) -> Extent2D {
        let size = self.window.inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn take_resize(&mut self) -> Option<Extent2D> {
        None
    }
}

impl HasWindowHandle for TestWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window.window_handle()
    }
}

impl HasDisplayHandle for TestWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.window.display_handle()
    }
}

fn create_event_loop() -> EventLoop<()> {
    let mut builder = EventLoop::builder();
    #[cfg(target_os = "linux")]
    {
        // Test harness threads are not the main thread
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    builder.build().unwrap()
}

/// Helper to create a test window for Vulkan
#[allow(deprecated)]
fn create_test_window(event_loop: &EventLoop<()>, frames: usize) -> TestWindow {
    let window_attrs = winit::window::Window::default_attributes()
        .with_title("Thinframe Vulkan Test")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false); // Hidden window for tests
    let window = event_loop.create_window(window_attrs).unwrap();
    TestWindow { window, frames_left: frames }
}

/// Valid SPIR-V header followed by no instructions
fn empty_spirv_module() -> Vec<u8> {
    [0x0723_0203u32, 0x0001_0000, 0, 1, 0]
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect()
}

fn test_config() -> Config {
    Config {
        app_name: "Thinframe Vulkan Tests".to_string(),
        enable_validation: false,
        ..Config::default()
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

fn device_creation(event_loop: &EventLoop<()>) {
    let window = create_test_window(event_loop, 0);
    let device = VulkanDeviceFactory::new().create_device(&window, &test_config()).unwrap();

    let info = device.info();
    assert_eq!(info.backend, "vulkan");
    assert!(!info.name.is_empty());

    let fence = device.create_fence(true).unwrap();
    device.wait_for_fence(fence.as_ref()).unwrap();
    device.reset_fence(fence.as_ref()).unwrap();
    let _semaphore = device.create_semaphore().unwrap();
    let mut pool = device.create_command_pool().unwrap();
    let lists = pool.allocate(3).unwrap();
    assert_eq!(lists.len(), 3);
    drop(lists);
    drop(pool);
    device.wait_idle().unwrap();
}

fn full_lifecycle(event_loop: &EventLoop<()>) {
    let window = create_test_window(event_loop, 10);
    let mut renderer = RendererContext::new(window, Arc::new(MemoryByteSupplier::new()), test_config());
    renderer.create(&VulkanDeviceFactory::new()).unwrap();
    assert_eq!(renderer.completed_stages(), RendererStage::ALL.to_vec());
    assert_eq!(renderer.device_info().map(|info| info.backend), Some("vulkan"));

    let mut frames = 0;
    while renderer.window().active() {
        renderer.window_mut().update();
        let status = renderer.draw().unwrap();
        assert_ne!(status, FrameStatus::Skipped);
        frames += 1;
    }
    assert_eq!(frames, 10);
    assert!(renderer.stats().frames_presented > 0);
    assert!(renderer.stats().swapchain_images >= 2);

    renderer.destroy();
    assert!(renderer.completed_stages().is_empty());
    renderer.destroy();
    assert!(!renderer.is_active());

    // A destroyed renderer can be created again on the same window
    renderer.create(&VulkanDeviceFactory::new()).unwrap();
    renderer.window_mut().frames_left = 1;
    renderer.draw().unwrap();
    renderer.destroy();
}

fn shader_failures(event_loop: &EventLoop<()>) {
    let supplier = MemoryByteSupplier::new()
        .with("broken.vert.spv", vec![1, 2, 3])
        .with("empty.vert.spv", empty_spirv_module())
        .with("empty.frag.spv", empty_spirv_module());
    let window = create_test_window(event_loop, 2);
    let mut renderer = RendererContext::new(window, Arc::new(supplier), test_config());
    renderer.create(&VulkanDeviceFactory::new()).unwrap();

    let missing = renderer.create_shader(&ShaderSpec::new("missing.vert.spv", "missing.frag.spv"));
    assert!(matches!(missing, Err(Error::ShaderLoad { ref path, .. }) if path == "missing.vert.spv"));

    let unaligned = renderer.create_shader(&ShaderSpec::new("broken.vert.spv", "empty.frag.spv"));
    assert!(matches!(unaligned, Err(Error::ModuleCompile(_))));

    // No entry point named "main"
    let no_entry = renderer.create_shader(&ShaderSpec::new("empty.vert.spv", "empty.frag.spv"));
    assert!(matches!(no_entry, Err(Error::ModuleCompile(_))));

    assert_eq!(renderer.stats().pipelines, 0);

    // Failed shaders leave the renderer drawable
    renderer.window_mut().update();
    renderer.draw().unwrap();
    renderer.destroy();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_backend_end_to_end() {
    let event_loop = create_event_loop();
    device_creation(&event_loop);
    full_lifecycle(&event_loop);
    shader_failures(&event_loop);
}
