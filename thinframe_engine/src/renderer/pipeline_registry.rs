//! Pipeline registry - compiles shader pairs into pipelines and owns them
//!
//! Callers get a `PipelineHandle` (slot map key + id), never a reference into
//! the registry's storage. A handle whose pipeline was destroyed is detected
//! by the slot map generation and rejected. Every insert, erase and snapshot
//! happens under one mutex; compilation happens outside it.
//!
//! Recording uses `snapshot()`, which hands out `Arc` clones. A pipeline removed
//! from the registry stays alive until the last command list that references
//! it is re-recorded.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use slotmap::{new_key_type, SlotMap};

use crate::byte_supplier::ByteSupplier;
use crate::config::ShaderSpec;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Pipeline, PipelineDesc, RenderPass, Shader, ShaderDesc, ShaderStage,
};

new_key_type! {
    /// Slot map key of a registry entry
    pub struct PipelineKey;
}

/// Registry-unique pipeline id, assigned in creation order and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipelineId(pub u64);

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-side reference to a registered pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle {
    key: PipelineKey,
    id: PipelineId,
}

impl PipelineHandle {
    pub fn id(&self) -> PipelineId {
        self.id
    }
}

/// A compiled pipeline with the shader modules it was built from
pub struct GraphicsPipeline {
    id: PipelineId,
    spec: ShaderSpec,
    // Pipeline is released before its shader modules
    pipeline: Box<dyn Pipeline>,
    vertex_shader: Box<dyn Shader>,
    fragment_shader: Box<dyn Shader>,
}

impl GraphicsPipeline {
    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn spec(&self) -> &ShaderSpec {
        &self.spec
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    pub fn vertex_shader(&self) -> &dyn Shader {
        self.vertex_shader.as_ref()
    }

    pub fn fragment_shader(&self) -> &dyn Shader {
        self.fragment_shader.as_ref()
    }
}

/// Live pipelines in id order, with the registry revision they were taken at
pub struct PipelineSnapshot {
    pub revision: u64,
    pub pipelines: Vec<Arc<GraphicsPipeline>>,
}

struct RegistryState {
    // Released by `clear()` so a registry shared past teardown pins no GPU objects
    device: Option<Arc<dyn GraphicsDevice>>,
    entries: SlotMap<PipelineKey, Arc<GraphicsPipeline>>,
    next_id: u64,
    revision: u64,
    render_pass: Option<Arc<dyn RenderPass>>,
    closed: bool,
}

pub struct PipelineRegistry {
    supplier: Arc<dyn ByteSupplier>,
    default_spec: ShaderSpec,
    state: Mutex<RegistryState>,
    /// Memoized `create_default_shader` result. Lock order: this, then `state`.
    default_pipeline: Mutex<Option<PipelineHandle>>,
}

impl PipelineRegistry {
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        supplier: Arc<dyn ByteSupplier>,
        render_pass: Arc<dyn RenderPass>,
        default_spec: ShaderSpec,
    ) -> Self {
        Self {
            supplier,
            default_spec,
            state: Mutex::new(RegistryState {
                device: Some(device),
                entries: SlotMap::with_key(),
                next_id: 1,
                revision: 0,
                render_pass: Some(render_pass),
                closed: false,
            }),
            default_pipeline: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>> {
        self.state
            .lock()
            .map_err(|_| Error::BackendError("Pipeline registry lock poisoned".to_string()))
    }

    fn load_stage(
        &self,
        device: &dyn GraphicsDevice,
        path: &str,
        stage: ShaderStage,
        entry_point: &str,
    ) -> Result<Box<dyn Shader>> {
        let code = self.supplier.load_bytes(path).map_err(|e| {
            crate::engine_error!("thinframe::PipelineRegistry", "Cannot load {:?} shader '{}': {}", stage, path, e);
            Error::ShaderLoad { path: path.to_string(), reason: e.to_string() }
        })?;
        device
            .create_shader(&ShaderDesc { code: &code, stage, entry_point })
            .map_err(|e| {
                crate::engine_error!("thinframe::PipelineRegistry", "Cannot compile '{}': {}", path, e);
                match e {
                    Error::ModuleCompile(_) => e,
                    other => Error::ModuleCompile(format!("{}: {}", path, other)),
                }
            })
    }

    /// Compile `spec` into a pipeline and register it under a fresh id
    ///
    /// # Errors
    ///
    /// - `Error::ShaderLoad` if either bytecode file cannot be read
    /// - `Error::ModuleCompile` if either bytecode is malformed
    /// - `Error::PipelineCreation` if the pipeline cannot be built
    /// - `Error::InitializationFailed` once the registry is closed
    pub fn create_shader(&self, spec: &ShaderSpec) -> Result<PipelineHandle> {
        let (device, render_pass) = {
            let state = self.lock()?;
            match (&state.device, &state.render_pass) {
                (Some(device), Some(render_pass)) if !state.closed => (device.clone(), render_pass.clone()),
                _ => return Err(Error::InitializationFailed("Pipeline registry is closed".to_string())),
            }
        };

        let vertex_shader =
            self.load_stage(device.as_ref(), &spec.vertex_path, ShaderStage::Vertex, &spec.entry_point)?;
        let fragment_shader =
            self.load_stage(device.as_ref(), &spec.fragment_path, ShaderStage::Fragment, &spec.entry_point)?;

        let pipeline = device
            .create_pipeline(&PipelineDesc::fixed(
                vertex_shader.as_ref(),
                fragment_shader.as_ref(),
                render_pass.as_ref(),
            ))
            .map_err(|e| {
                crate::engine_error!("thinframe::PipelineRegistry", "Pipeline creation failed: {}", e);
                match e {
                    Error::PipelineCreation(_) => e,
                    other => Error::PipelineCreation(other.to_string()),
                }
            })?;

        let mut state = self.lock()?;
        if state.closed {
            return Err(Error::InitializationFailed("Pipeline registry closed during compilation".to_string()));
        }
        let id = PipelineId(state.next_id);
        state.next_id += 1;
        let key = state.entries.insert(Arc::new(GraphicsPipeline {
            id,
            spec: spec.clone(),
            pipeline,
            vertex_shader,
            fragment_shader,
        }));
        state.revision += 1;
        drop(state);

        crate::engine_info!(
            "thinframe::PipelineRegistry",
            "Pipeline {} created from '{}' + '{}'",
            id, spec.vertex_path, spec.fragment_path
        );
        Ok(PipelineHandle { key, id })
    }

    /// Remove a pipeline and release its GPU objects
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if the handle is unknown or was already destroyed.
    pub fn destroy_shader(&self, handle: PipelineHandle) -> Result<()> {
        let removed = {
            let mut state = self.lock()?;
            match state.entries.get(handle.key) {
                Some(entry) if entry.id == handle.id => {}
                _ => {
                    return Err(Error::InvalidResource(format!(
                        "Pipeline {} is not registered",
                        handle.id
                    )))
                }
            }
            let removed = state.entries.remove(handle.key);
            state.revision += 1;
            removed
        };

        if let Ok(mut default) = self.default_pipeline.lock() {
            if *default == Some(handle) {
                *default = None;
            }
        }

        crate::engine_info!("thinframe::PipelineRegistry", "Pipeline {} destroyed", handle.id);
        // Released here unless a recorded command list still holds it
        drop(removed);
        Ok(())
    }

    /// Pipeline built from the configured default shader pair, compiled on first use
    ///
    /// Later calls return the same handle without compiling again, until that
    /// pipeline is destroyed.
    pub fn create_default_shader(&self) -> Result<PipelineHandle> {
        let mut default = self
            .default_pipeline
            .lock()
            .map_err(|_| Error::BackendError("Default pipeline lock poisoned".to_string()))?;
        if let Some(handle) = *default {
            if self.contains(handle) {
                return Ok(handle);
            }
        }
        let handle = self.create_shader(&self.default_spec)?;
        *default = Some(handle);
        Ok(handle)
    }

    pub fn contains(&self, handle: PipelineHandle) -> bool {
        self.lock()
            .map(|state| matches!(state.entries.get(handle.key), Some(entry) if entry.id == handle.id))
            .unwrap_or(false)
    }

    pub fn get(&self, handle: PipelineHandle) -> Option<Arc<GraphicsPipeline>> {
        let state = self.lock().ok()?;
        state
            .entries
            .get(handle.key)
            .filter(|entry| entry.id == handle.id)
            .cloned()
    }

    /// Id of a live pipeline, `None` for a stale handle
    pub fn pipeline_id(&self, handle: PipelineHandle) -> Option<PipelineId> {
        self.contains(handle).then_some(handle.id)
    }

    pub fn find_by_id(&self, id: PipelineId) -> Option<PipelineHandle> {
        let state = self.lock().ok()?;
        state
            .entries
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(key, _)| PipelineHandle { key, id })
    }

    pub fn pipeline_count(&self) -> usize {
        self.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    /// Bumped on every insert and erase
    pub fn revision(&self) -> u64 {
        self.lock().map(|state| state.revision).unwrap_or(0)
    }

    /// Live pipelines in id order
    pub fn snapshot(&self) -> Result<PipelineSnapshot> {
        let state = self.lock()?;
        let mut pipelines: Vec<Arc<GraphicsPipeline>> = state.entries.values().cloned().collect();
        pipelines.sort_by_key(|p| p.id);
        Ok(PipelineSnapshot { revision: state.revision, pipelines })
    }

    /// Point future pipeline creations at the render pass of a rebuilt chain
    pub fn set_render_pass(&self, render_pass: Arc<dyn RenderPass>) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(current) = &state.render_pass {
            if current.color_format() != render_pass.color_format() {
                crate::engine_warn!(
                    "thinframe::PipelineRegistry",
                    "Color format changed from {:?} to {:?}; existing pipelines may be incompatible",
                    current.color_format(), render_pass.color_format()
                );
            }
        }
        state.render_pass = Some(render_pass);
        Ok(())
    }

    /// Release every pipeline and refuse further creations
    ///
    /// Idempotent. Callers must make sure the GPU no longer uses the pipelines.
    pub fn clear(&self) {
        let released = match self.state.lock() {
            Ok(mut state) => {
                state.closed = true;
                state.render_pass = None;
                state.device = None;
                if !state.entries.is_empty() {
                    state.revision += 1;
                }
                std::mem::take(&mut state.entries)
            }
            Err(_) => return,
        };
        if let Ok(mut default) = self.default_pipeline.lock() {
            *default = None;
        }
        if !released.is_empty() {
            crate::engine_debug!("thinframe::PipelineRegistry", "Releasing {} pipelines", released.len());
        }
        drop(released);
    }

    pub fn is_closed(&self) -> bool {
        self.lock().map(|state| state.closed).unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "pipeline_registry_tests.rs"]
mod tests;
