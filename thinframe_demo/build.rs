//! Compiles the default GLSL shaders to SPIR-V in OUT_DIR
//!
//! main.rs embeds the results, so the demo draws without any asset files.

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

const SHADERS: [(&str, shaderc::ShaderKind, &str); 2] = [
    ("assets/shaders/default.vert.glsl", shaderc::ShaderKind::Vertex, "default_vert.spv"),
    ("assets/shaders/default.frag.glsl", shaderc::ShaderKind::Fragment, "default_frag.spv"),
];

fn main() -> Result<(), Box<dyn Error>> {
    let out = PathBuf::from(env::var("OUT_DIR")?);

    let compiler = shaderc::Compiler::new()?;
    let mut options = shaderc::CompileOptions::new()?;
    options.set_target_env(shaderc::TargetEnv::Vulkan, shaderc::EnvVersion::Vulkan1_0 as u32);
    options.set_optimization_level(shaderc::OptimizationLevel::Performance);

    for (source_path, kind, output) in SHADERS {
        println!("cargo:rerun-if-changed={}", source_path);
        let source = fs::read_to_string(source_path)?;
        let artifact = compiler.compile_into_spirv(&source, kind, source_path, "main", Some(&options))?;
        if artifact.get_num_warnings() > 0 {
            println!("cargo:warning={}: {}", source_path, artifact.get_warning_messages());
        }
        fs::write(out.join(output), artifact.as_binary_u8())?;
    }

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
