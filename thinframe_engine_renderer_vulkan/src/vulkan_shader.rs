/// VulkanShader - shader module compiled from SPIR-V
///
/// Bytecode is checked twice before reaching the driver: the core header
/// check, then a spirq reflection pass that must find the requested entry
/// point at the requested stage.

use ash::vk;
use std::io::Cursor;
use std::sync::Arc;
use thinframe_engine::engine_warn;
use thinframe_engine::thinframe::render::{validate_spirv, Shader, ShaderDesc, ShaderStage};
use thinframe_engine::thinframe::{Error, Result};

use crate::vulkan::shader_stage_to_vk;
use crate::vulkan_context::GpuContext;

pub struct VulkanShader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: String,
}

impl VulkanShader {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &ShaderDesc) -> Result<Self> {
        validate_spirv(desc.code)?;

        // read_spv copies into u32 words, so the byte slice may be unaligned
        let words = ash::util::read_spv(&mut Cursor::new(desc.code))
            .map_err(|e| Error::ModuleCompile(format!("Cannot read SPIR-V words: {}", e)))?;
        check_entry_point(&words, desc.stage, desc.entry_point)?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe {
            ctx.device().create_shader_module(&create_info, None).map_err(|e| {
                engine_warn!("thinframe::vulkan", "vkCreateShaderModule failed: {:?}", e);
                Error::ModuleCompile(format!("vkCreateShaderModule: {:?}", e))
            })?
        };

        Ok(Self {
            ctx,
            module,
            stage: desc.stage,
            entry_point: desc.entry_point.to_string(),
        })
    }

    pub(crate) fn stage_flags(&self) -> vk::ShaderStageFlags {
        shader_stage_to_vk(self.stage)
    }
}

/// Execution model name spirq reports for a stage
pub(crate) fn execution_model_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "Vertex",
        ShaderStage::Fragment => "Fragment",
    }
}

/// Fail unless the module declares `entry_point` for `stage`
fn check_entry_point(words: &[u32], stage: ShaderStage, entry_point: &str) -> Result<()> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(false)
        .reflect()
        .map_err(|e| Error::ModuleCompile(format!("SPIR-V reflection failed: {:?}", e)))?;

    let wanted = execution_model_name(stage);
    let found = entry_points
        .iter()
        .any(|ep| ep.name == entry_point && format!("{:?}", ep.exec_model) == wanted);
    if found {
        Ok(())
    } else {
        let declared: Vec<String> = entry_points
            .iter()
            .map(|ep| format!("{} ({:?})", ep.name, ep.exec_model))
            .collect();
        Err(Error::ModuleCompile(format!(
            "No {} entry point named '{}' (module declares: {})",
            wanted,
            entry_point,
            declared.join(", ")
        )))
    }
}

impl Shader for VulkanShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device().destroy_shader_module(self.module, None);
        }
    }
}
