/// Renderer module - lifecycle, pipelines, command recording and frame submission

// Module declarations
pub mod presentation_chain;
pub mod pipeline_registry;
pub mod command_recorder;
pub mod frame_submitter;
pub mod renderer_context;

pub use presentation_chain::*;
pub use pipeline_registry::*;
pub use command_recorder::*;
pub use frame_submitter::*;
pub use renderer_context::*;
