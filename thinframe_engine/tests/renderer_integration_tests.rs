//! Integration tests for the public renderer lifecycle API
//!
//! Uses a device factory that always fails, so no GPU is required.
//!
//! Run with: cargo test --test renderer_integration_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serial_test::serial;
use thinframe_engine::thinframe::log::{LogEntry, LogSeverity, Logger};
use thinframe_engine::thinframe::render::{DeviceFactory, Extent2D, GraphicsDevice};
use thinframe_engine::thinframe::{
    ByteSupplier, Config, Engine, Error, FileByteSupplier, MemoryByteSupplier, RendererContext, RendererId,
    Result, ShaderSpec, Window,
};

// ============================================================================
// TEST COLLABORATORS
// ============================================================================

#[derive(Default)]
struct HeadlessWindow {
    attached: Vec<RendererId>,
    detached: Vec<RendererId>,
}

impl Window for HeadlessWindow {
    fn active(&self) -> bool {
        true
    }

    fn update(&mut self) {}

    fn extent(&self) -> Extent2D {
        Extent2D::new(640, 480)
    }

    fn take_resize(&mut self) -> Option<Extent2D> {
        None
    }

    fn on_renderer_attached(&mut self, renderer: RendererId) {
        self.attached.push(renderer);
    }

    fn on_renderer_detached(&mut self, renderer: RendererId) {
        self.detached.push(renderer);
    }
}

/// Factory for a machine without a usable GPU
#[derive(Default)]
struct NoGpuFactory {
    calls: AtomicUsize,
}

impl DeviceFactory<HeadlessWindow> for NoGpuFactory {
    fn create_device(&self, _window: &HeadlessWindow, _config: &Config) -> Result<Arc<dyn GraphicsDevice>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::DeviceCreationFailed("no Vulkan-capable adapter".to_string()))
    }
}

struct CaptureLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String)>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push((entry.severity, entry.message.clone()));
    }
}

fn new_renderer() -> RendererContext<HeadlessWindow> {
    RendererContext::new(HeadlessWindow::default(), Arc::new(MemoryByteSupplier::new()), Config::default())
}

// ============================================================================
// LIFECYCLE TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_device_failure_is_fatal_and_logged() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });

    let factory = NoGpuFactory::default();
    let mut renderer = new_renderer();
    let result = renderer.create(&factory);

    Engine::reset_logger();

    let error = result.unwrap_err();
    assert!(error.is_fatal());
    assert!(matches!(error, Error::DeviceCreationFailed(_)));
    assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    assert!(!renderer.is_active());
    assert!(renderer.completed_stages().is_empty());
    assert!(renderer.window().attached.is_empty());

    let captured = entries.lock().unwrap();
    assert!(captured
        .iter()
        .any(|(severity, message)| *severity == LogSeverity::Error && message.contains("device")));
    assert!(Engine::fatal_message(&error).contains("no Vulkan-capable adapter"));
}

#[test]
fn test_integration_failed_create_can_be_retried() {
    let factory = NoGpuFactory::default();
    let mut renderer = new_renderer();
    assert!(renderer.create(&factory).is_err());
    assert!(renderer.create(&factory).is_err());
    assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_integration_operations_before_create_fail() {
    let mut renderer = new_renderer();

    assert!(matches!(renderer.draw(), Err(Error::InitializationFailed(_))));
    assert!(matches!(
        renderer.create_shader(&ShaderSpec::default()),
        Err(Error::InitializationFailed(_))
    ));
    assert!(renderer.pipelines().is_err());
    assert!(renderer.device_info().is_none());
    assert_eq!(renderer.stats().frames_presented, 0);
}

#[test]
fn test_integration_destroy_without_create_is_noop() {
    let mut renderer = new_renderer();
    renderer.destroy();
    renderer.destroy();
    assert!(renderer.window().detached.is_empty());
}

#[test]
fn test_integration_renderer_ids_are_unique() {
    let a = new_renderer();
    let b = new_renderer();
    assert_ne!(a.id(), b.id());
}

// ============================================================================
// BYTE SUPPLIER TESTS
// ============================================================================

#[test]
fn test_integration_file_byte_supplier_reads_relative_paths() {
    let root = std::env::temp_dir().join(format!("thinframe_supplier_{}", std::process::id()));
    std::fs::create_dir_all(root.join("assets")).unwrap();
    std::fs::write(root.join("assets/default_vert.spv"), [3u8, 2, 35, 7]).unwrap();

    let supplier = FileByteSupplier::new(&root);
    assert_eq!(supplier.load_bytes("assets/default_vert.spv").unwrap(), vec![3, 2, 35, 7]);
    assert!(matches!(supplier.load_bytes("assets/missing.spv"), Err(Error::NotFound(_))));

    std::fs::remove_dir_all(&root).unwrap();
}
