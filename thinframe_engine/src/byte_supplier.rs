//! Byte supplier collaborator
//!
//! Shader bytecode reaches the renderer through a `ByteSupplier`, so the
//! renderer never touches storage directly.

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};

/// Source of raw asset bytes
pub trait ByteSupplier: Send + Sync {
    /// Load every byte stored under `path`
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the path cannot be opened.
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>>;
}

/// Reads files relative to a root directory
#[derive(Debug, Clone)]
pub struct FileByteSupplier {
    root: PathBuf,
}

impl FileByteSupplier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ByteSupplier for FileByteSupplier {
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| {
            crate::engine_debug!("thinframe::ByteSupplier", "Cannot read '{}': {}", full.display(), e);
            Error::NotFound(full.display().to_string())
        })
    }
}

/// In-memory byte store (embedded assets, tests)
#[derive(Default)]
pub struct MemoryByteSupplier {
    files: RwLock<FxHashMap<String, Vec<u8>>>,
}

impl MemoryByteSupplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `path`, replacing any previous content
    pub fn insert(&self, path: impl Into<String>, bytes: Vec<u8>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), bytes);
        }
    }

    pub fn remove(&self, path: &str) -> bool {
        self.files
            .write()
            .map(|mut files| files.remove(path).is_some())
            .unwrap_or(false)
    }

    /// Builder-style `insert`
    pub fn with(self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl ByteSupplier for MemoryByteSupplier {
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let files = self
            .files
            .read()
            .map_err(|_| Error::BackendError("Byte supplier lock poisoned".to_string()))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }
}

#[cfg(test)]
#[path = "byte_supplier_tests.rs"]
mod tests;
