//! Shader trait and SPIR-V validation

use crate::error::{Error, Result};
use crate::graphics_device::AsAny;

/// SPIR-V magic number, first word of every module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Size of the SPIR-V header (magic, version, generator, bound, schema)
pub const SPIRV_HEADER_BYTES: usize = 20;

/// Pipeline stage a shader module runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Compiled shader module
pub trait Shader: AsAny + Send + Sync {
    fn stage(&self) -> ShaderStage;

    fn entry_point(&self) -> &str;
}

/// Descriptor for creating a shader module
#[derive(Debug, Clone, Copy)]
pub struct ShaderDesc<'a> {
    /// Raw SPIR-V bytecode (little-endian words)
    pub code: &'a [u8],
    pub stage: ShaderStage,
    pub entry_point: &'a str,
}

/// Reject bytecode that cannot be a SPIR-V module
///
/// Checks word alignment, header size and the magic number. Deeper checks
/// (entry points, instruction stream) belong to the backend.
pub fn validate_spirv(code: &[u8]) -> Result<()> {
    if code.len() % 4 != 0 {
        return Err(Error::ModuleCompile(format!(
            "bytecode length {} is not a multiple of 4",
            code.len()
        )));
    }
    if code.len() < SPIRV_HEADER_BYTES {
        return Err(Error::ModuleCompile(format!(
            "bytecode of {} bytes is shorter than the SPIR-V header",
            code.len()
        )));
    }
    let magic = u32::from_le_bytes([code[0], code[1], code[2], code[3]]);
    if magic != SPIRV_MAGIC {
        return Err(Error::ModuleCompile(format!("bad SPIR-V magic 0x{:08x}", magic)));
    }
    Ok(())
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
