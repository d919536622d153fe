//! Renderer configuration
//!
//! Plain values with sensible defaults. The renderer never reads configuration
//! from disk: callers build a `Config` and override the fields they need.

use glam::Vec4;
use crate::graphics_device::PresentMode;

/// Default vertex shader bytecode path, relative to the byte supplier root
pub const DEFAULT_VERTEX_SHADER: &str = "assets/default_vert.spv";

/// Default fragment shader bytecode path, relative to the byte supplier root
pub const DEFAULT_FRAGMENT_SHADER: &str = "assets/default_frag.spv";

/// Debug message severity levels (validation layer filter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugSeverity {
    /// Show only errors
    ErrorsOnly,
    /// Show errors and warnings
    ErrorsAndWarnings,
    /// Show all messages (verbose, info, warnings, errors)
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    Console,
    File(String),
    Both(String),
}

/// Names the vertex and fragment bytecode of one pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSpec {
    pub vertex_path: String,
    pub fragment_path: String,
    /// Entry point name, shared by both stages
    pub entry_point: String,
}

impl ShaderSpec {
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_path: vertex_path.into(),
            fragment_path: fragment_path.into(),
            entry_point: "main".to_string(),
        }
    }
}

impl Default for ShaderSpec {
    fn default() -> Self {
        Self::new(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
    }
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Minimum severity forwarded by the validation messenger
    pub debug_severity: DebugSeverity,
    pub debug_output: DebugOutput,
    /// Count validation messages per severity
    pub enable_validation_stats: bool,
    /// Presentation mode; unsupported modes fall back to `Fifo`
    pub present_mode: PresentMode,
    /// Number of frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Clear color of the single color attachment (RGBA)
    pub clear_color: Vec4,
    /// Bytecode used by `create_default_shader`
    pub default_shader: ShaderSpec,
}

impl Config {
    /// `max_frames_in_flight`, never less than one
    pub fn frames_in_flight(&self) -> usize {
        self.max_frames_in_flight.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Thinframe Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            enable_validation_stats: false,
            present_mode: PresentMode::Fifo,
            max_frames_in_flight: 2,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            default_shader: ShaderSpec::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
