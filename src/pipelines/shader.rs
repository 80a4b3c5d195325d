use crate::error::ShaderError;

use gfx_auxil as auxil;
use glsl_to_spirv::ShaderType;

use std::{fs, path::Path};

pub const VERTEX_SHADER_PATH: &str = "shaders/vertex.glsl";
pub const FRAGMENT_SHADER_PATH: &str = "shaders/fragment.glsl";

/// Reads a GLSL shader from disk and compiles it to SPIR-V words.
pub fn compile_shader(path: impl AsRef<Path>, ty: ShaderType) -> Result<Vec<u32>, ShaderError> {
    let path = path.as_ref();

    let source = fs::read_to_string(path).map_err(|source| ShaderError::Open {
        path: path.to_owned(),
        source,
    })?;

    // glslang writes its info log into the error on failure
    let spirv_file = glsl_to_spirv::compile(&source, ty).map_err(|log| ShaderError::Compile {
        path: path.to_owned(),
        log: log.trim().to_owned(),
    })?;

    let spirv = auxil::read_spirv(spirv_file).map_err(|source| ShaderError::Spirv {
        path: path.to_owned(),
        source,
    })?;

    log::debug!("compiled {} ({} words)", path.display(), spirv.len());
    Ok(spirv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn test_missing_shader_reports_path() {
        let err = compile_shader("shaders/does_not_exist.glsl", ShaderType::Vertex).unwrap_err();

        assert!(matches!(err, ShaderError::Open { .. }));
        assert!(err.to_string().contains("does_not_exist.glsl"));
    }

    #[test]
    fn test_bundled_shaders_compile() {
        let vertex = compile_shader(VERTEX_SHADER_PATH, ShaderType::Vertex).unwrap();
        let fragment = compile_shader(FRAGMENT_SHADER_PATH, ShaderType::Fragment).unwrap();

        assert_eq!(vertex[0], SPIRV_MAGIC);
        assert_eq!(fragment[0], SPIRV_MAGIC);
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let path = std::env::temp_dir().join("gfx_quad_broken_shader.glsl");
        fs::write(&path, "#version 450\nvoid main() { this is not glsl }\n").unwrap();

        let err = compile_shader(&path, ShaderType::Fragment).unwrap_err();
        let _ = fs::remove_file(&path);

        assert!(matches!(err, ShaderError::Compile { .. }));
        assert!(err.to_string().contains("info log"));
    }
}
