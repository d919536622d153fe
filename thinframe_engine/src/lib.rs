/*!
# Thinframe Engine

Backend-agnostic core of the Thinframe renderer.

A `RendererContext` owns everything needed to draw into one window: a
graphics device, a presentation chain, a pipeline registry, per-image command
lists and the frame synchronization ring. GPU objects are trait objects
defined in `render`; a backend crate (Vulkan) implements them and supplies a
`DeviceFactory`.

## Architecture

- **GraphicsDevice**: Factory trait for GPU objects
- **PresentationChain**: Swapchain, image views, render pass, framebuffers
- **PipelineRegistry**: Thread-safe set of compiled pipelines
- **CommandRecorder**: One command list per swapchain image
- **FrameSubmitter**: Acquire, submit, present
- **RendererContext**: Ordered creation and teardown of all of the above
*/

// Internal modules
mod error;
mod engine;
mod config;
mod window;
mod byte_supplier;
pub mod log;
pub mod graphics_device;
pub mod renderer;

// Main thinframe namespace module
pub mod thinframe {
    // Error types
    pub use crate::error::{Error, FrameError, Result};

    // Process-wide services
    pub use crate::engine::{Engine, FATAL_EXIT_CODE};

    // Configuration
    pub use crate::config::{
        Config, DebugOutput, DebugSeverity, ShaderSpec, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER,
    };

    // Collaborators
    pub use crate::window::Window;
    pub use crate::byte_supplier::{ByteSupplier, FileByteSupplier, MemoryByteSupplier};

    // Renderer lifecycle
    pub use crate::renderer::{
        FrameStatus, PipelineHandle, PipelineId, PipelineRegistry, RendererContext, RendererId,
        RendererStage, RendererStats,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // GPU boundary implemented by backends
    pub mod render {
        pub use crate::graphics_device::*;
    }
}

// Re-export math library at crate root
pub use glam;
