//! Thinframe demo - opens a window and draws the default pipeline until it is closed

mod winit_window;

use std::sync::Arc;

use thinframe_engine::thinframe::{
    Config, Engine, FrameStatus, MemoryByteSupplier, RendererContext, Window, DEFAULT_FRAGMENT_SHADER,
    DEFAULT_VERTEX_SHADER,
};
use thinframe_engine::{engine_info, engine_warn};
use thinframe_engine_renderer_vulkan::{print_validation_stats_report, VulkanDeviceFactory};

use crate::winit_window::{WindowDesc, WinitWindow};

// Compiled by build.rs
const DEFAULT_VERTEX_SPIRV: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/default_vert.spv"));
const DEFAULT_FRAGMENT_SPIRV: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/default_frag.spv"));

/// Serves the embedded default shaders at the paths the renderer asks for
fn shader_supplier() -> MemoryByteSupplier {
    MemoryByteSupplier::new()
        .with(DEFAULT_VERTEX_SHADER, DEFAULT_VERTEX_SPIRV.to_vec())
        .with(DEFAULT_FRAGMENT_SHADER, DEFAULT_FRAGMENT_SPIRV.to_vec())
}

fn main() {
    let window = match WinitWindow::new(WindowDesc {
        title: "Thinframe Demo".to_string(),
        ..WindowDesc::default()
    }) {
        Ok(window) => window,
        Err(e) => Engine::fatal("thinframe::demo", &e),
    };

    let config = Config {
        app_name: "Thinframe Demo".to_string(),
        enable_validation_stats: cfg!(feature = "vulkan-validation"),
        ..Config::default()
    };
    let supplier = Arc::new(shader_supplier());
    let mut renderer = RendererContext::new(window, supplier, config);

    if let Err(e) = renderer.create(&VulkanDeviceFactory::new()) {
        Engine::fatal("thinframe::demo", &e);
    }

    match renderer.create_default_shader() {
        Ok(handle) => engine_info!("thinframe::demo", "Default pipeline ready ({:?})", handle),
        Err(e) => engine_warn!("thinframe::demo", "No default pipeline: {}", e),
    }

    while renderer.window().active() {
        renderer.window_mut().update();
        if !renderer.window().active() {
            break;
        }
        match renderer.draw() {
            Ok(FrameStatus::Skipped) => std::thread::sleep(std::time::Duration::from_millis(16)),
            Ok(_) => {}
            Err(e) => engine_warn!("thinframe::demo", "Frame dropped: {}", e),
        }
    }

    let stats = renderer.stats();
    renderer.destroy();
    engine_info!(
        "thinframe::demo",
        "{} frames presented, {} skipped, {} chain rebuilds",
        stats.frames_presented,
        stats.frames_skipped,
        stats.chain_rebuilds
    );
    print_validation_stats_report();
}
