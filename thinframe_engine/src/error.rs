//! Error types for the Thinframe engine
//!
//! Two tiers of failure exist. Device creation failures are fatal: no renderer
//! can exist without a device, so the entry point is expected to log them and
//! terminate. Everything else (shader loading, pipeline creation, per-frame
//! submission) is reported to the caller, who decides whether to retry, skip
//! the frame, or abort renderer creation.

use std::fmt;

/// Result type for Thinframe engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Thinframe engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid or stale resource handle (pipeline, swapchain image, etc.)
    InvalidResource(String),

    /// Initialization failed (renderer stage, subsystem)
    InitializationFailed(String),

    /// No usable GPU, logical device or allocator could be created
    DeviceCreationFailed(String),

    /// A byte supplier could not open the requested path
    NotFound(String),

    /// Shader bytecode for one of the stages could not be loaded
    ShaderLoad {
        /// Path handed to the byte supplier
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Shader bytecode is malformed and could not be turned into a module
    ModuleCompile(String),

    /// The graphics pipeline or its layout could not be built
    PipelineCreation(String),

    /// A frame could not be acquired, recorded, submitted or presented
    Frame(FrameError),
}

/// Per-frame failure, always recoverable
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Acquiring the next presentable image failed
    Acquire(String),

    /// Recording the command list for the acquired image failed
    Record(String),

    /// Queue submission failed
    Submit(String),

    /// Presentation failed
    Present(String),

    /// Replacing a stale presentation chain failed
    Rebuild(String),
}

impl Error {
    /// Returns true for errors after which no renderer can exist
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DeviceCreationFailed(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceCreationFailed(msg) => write!(f, "Device creation failed: {}", msg),
            Error::NotFound(path) => write!(f, "Not found: {}", path),
            Error::ShaderLoad { path, reason } => {
                write!(f, "Shader load failed for '{}': {}", path, reason)
            }
            Error::ModuleCompile(msg) => write!(f, "Shader module compilation failed: {}", msg),
            Error::PipelineCreation(msg) => write!(f, "Pipeline creation failed: {}", msg),
            Error::Frame(err) => write!(f, "Frame error: {}", err),
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Acquire(msg) => write!(f, "acquire failed: {}", msg),
            FrameError::Record(msg) => write!(f, "command recording failed: {}", msg),
            FrameError::Submit(msg) => write!(f, "submit failed: {}", msg),
            FrameError::Present(msg) => write!(f, "present failed: {}", msg),
            FrameError::Rebuild(msg) => write!(f, "presentation chain rebuild failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl std::error::Error for FrameError {}

impl From<FrameError> for Error {
    fn from(err: FrameError) -> Self {
        Error::Frame(err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
