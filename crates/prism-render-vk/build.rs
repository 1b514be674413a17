use std::{env, fs, path::PathBuf};

const FRAME_BLOCK: &str = include_str!("shaders/frame.glsl");
const VERTEX: &str = include_str!("shaders/mesh.vert");
const FRAGMENT: &str = include_str!("shaders/mesh.frag");

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    let compiler = shaderc::Compiler::new().expect("shaderc compiler");
    let mut opts = shaderc::CompileOptions::new().expect("shaderc options");
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    for (name, kind, body) in [
        ("mesh.vert", shaderc::ShaderKind::Vertex, VERTEX),
        ("mesh.frag", shaderc::ShaderKind::Fragment, FRAGMENT),
    ] {
        let src = format!("#version 450\n{FRAME_BLOCK}{body}");
        let spv = compiler
            .compile_into_spirv(&src, kind, name, "main", Some(&opts))
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        fs::write(out.join(format!("{name}.spv")), spv.as_binary_u8())
            .unwrap_or_else(|e| panic!("write {name}.spv: {e}"));
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=shaders");
}
