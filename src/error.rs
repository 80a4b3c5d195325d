use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors while turning a GLSL file into SPIR-V.
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Unable to open shader {}: {}", .path.display(), .source)]
    Open { path: PathBuf, source: io::Error },
    #[error("{} info log: {}", .path.display(), .log)]
    Compile { path: PathBuf, log: String },
    #[error("Invalid SPIR-V produced for {}: {}", .path.display(), .source)]
    Spirv { path: PathBuf, source: io::Error },
}

/// Errors while building the graphics pipeline. The renderer survives these
/// and keeps clearing the screen.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("Shader module creation failed: {0}")]
    ShaderModule(String),
    #[error("Shader program linking failed: {0}")]
    Link(String),
    #[error("Could not {action}: {detail}")]
    Device { action: &'static str, detail: String },
}

/// Fatal errors while bringing up the window and device.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Could not open window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Could not create a backend instance: {0}")]
    Backend(String),
    #[error("Could not create a surface: {0}")]
    Surface(String),
    #[error("No graphics adapter found")]
    NoAdapter,
    #[error("No queue family supports presentation")]
    NoQueueFamily,
    #[error("No CPU-visible memory type for the vertex buffer")]
    NoUploadMemory,
    #[error("Could not {action}: {detail}")]
    Device { action: &'static str, detail: String },
}

impl InitError {
    /// Adapter for `map_err` on gfx-hal results, which carry their own error
    /// type per call.
    pub fn device<E: std::fmt::Debug>(action: &'static str) -> impl FnOnce(E) -> Self {
        move |err| InitError::Device {
            action,
            detail: format!("{:?}", err),
        }
    }
}

impl PipelineError {
    pub fn device<E: std::fmt::Debug>(action: &'static str) -> impl FnOnce(E) -> Self {
        move |err| PipelineError::Device {
            action,
            detail: format!("{:?}", err),
        }
    }
}
