use crate::entities::Vertex;
use crate::error::{InitError, PipelineError};
use super::shader::{self, compile_shader};

use std::rc::Rc;

use gfx_hal as hal;
use glsl_to_spirv::ShaderType;

use hal::{
    format,
    image, pass,
    pass::Subpass,
    prelude::*,
    pso,
    pso::{
        VertexInputRate, InputAssemblerDesc,
        Primitive, PrimitiveAssemblerDesc
    },
};

use std::{
    iter,
    mem::ManuallyDrop,
    ptr,
};

const ENTRY_NAME: &str = "main";
const PIPELINE_CACHE_PATH: &str = "quad_pipeline_cache";

/// The linked vertex + fragment program together with its layout and cache.
pub struct Pipeline<B: hal::Backend> {
    device: Rc<B::Device>,
    pipeline_layout: ManuallyDrop<B::PipelineLayout>,
    pipeline: ManuallyDrop<B::GraphicsPipeline>,
    pipeline_cache: Option<B::PipelineCache>,
}


impl<B: hal::Backend> Pipeline<B> {
    /// Compiles the shaders from disk and links them into a pipeline for
    /// `render_pass`.
    pub fn new(
        device: Rc<B::Device>,
        render_pass: &B::RenderPass,
    ) -> Result<Self, PipelineError> {
        let vs_spirv = compile_shader(shader::VERTEX_SHADER_PATH, ShaderType::Vertex)?;
        let fs_spirv = compile_shader(shader::FRAGMENT_SHADER_PATH, ShaderType::Fragment)?;

        let pipeline_layout = unsafe {
            device.create_pipeline_layout(iter::empty(), iter::empty())
        }
        .map_err(PipelineError::device("create pipeline layout"))?;

        let pipeline_cache = load_pipeline_cache::<B>(&device);

        let pipeline = create_pipeline::<B>(
            &device,
            render_pass,
            &pipeline_layout,
            pipeline_cache.as_ref(),
            &vs_spirv,
            &fs_spirv,
        );

        let pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(err) => {
                unsafe {
                    device.destroy_pipeline_layout(pipeline_layout);
                    if let Some(cache) = pipeline_cache {
                        device.destroy_pipeline_cache(cache);
                    }
                }
                return Err(err);
            }
        };

        if let Some(cache) = pipeline_cache.as_ref() {
            save_pipeline_cache::<B>(&device, cache);
        }

        Ok(Self {
            device,
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            pipeline: ManuallyDrop::new(pipeline),
            pipeline_cache,
        })
    }

    pub fn pipeline(&self) -> &B::GraphicsPipeline {
        &*self.pipeline
    }
}

impl<B> Drop for Pipeline<B> where B: hal::Backend {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            log::warn!("device did not idle before pipeline teardown: {:?}", err);
        }

        unsafe {
            self.device
                .destroy_graphics_pipeline(ManuallyDrop::into_inner(ptr::read(
                    &self.pipeline,
                )));

            self.device
                .destroy_pipeline_layout(ManuallyDrop::into_inner(ptr::read(
                    &self.pipeline_layout,
                )));

            if let Some(cache) = self.pipeline_cache.take() {
                self.device.destroy_pipeline_cache(cache);
            }
        }

    }
}

/// Single colour pass: clear, draw, present.
pub fn create_render_pass<B: hal::Backend>(device: &B::Device, format: hal::format::Format) -> Result<B::RenderPass, InitError> {
        let attachment = pass::Attachment {
            format: Some(format),
            samples: 1,
            ops: pass::AttachmentOps::new(
                pass::AttachmentLoadOp::Clear,
                pass::AttachmentStoreOp::Store,
            ),
            stencil_ops: pass::AttachmentOps::DONT_CARE,
            layouts: image::Layout::Undefined..image::Layout::Present,
        };

        let subpass = pass::SubpassDesc {
            colors: &[(0, image::Layout::ColorAttachmentOptimal)],
            depth_stencil: None,
            inputs: &[],
            resolves: &[],
            preserves: &[],
        };

        unsafe {
            device.create_render_pass(
                iter::once(attachment),
                iter::once(subpass),
                iter::empty(),
            )
        }
        .map_err(InitError::device("create render pass"))
}

fn create_pipeline<B: hal::Backend>(
        device: &B::Device,
        render_pass: &B::RenderPass,
        pipeline_layout: &B::PipelineLayout,
        pipeline_cache: Option<&B::PipelineCache>,
        vs_spirv: &[u32],
        fs_spirv: &[u32],
    ) -> Result<B::GraphicsPipeline, PipelineError> {

    let vs_module = unsafe { device.create_shader_module(vs_spirv) }
        .map_err(|err| PipelineError::ShaderModule(format!("vertex: {:?}", err)))?;

    let fs_module = match unsafe { device.create_shader_module(fs_spirv) } {
        Ok(module) => module,
        Err(err) => {
            unsafe { device.destroy_shader_module(vs_module) };
            return Err(PipelineError::ShaderModule(format!("fragment: {:?}", err)));
        }
    };

    let (vs_entry, fs_entry) = (
        pso::EntryPoint {
            entry: ENTRY_NAME,
            module: &vs_module,
            specialization: pso::Specialization::default(),
        },
        pso::EntryPoint {
            entry: ENTRY_NAME,
            module: &fs_module,
            specialization: pso::Specialization::default(),
        },
    );

    // tightly packed pairs of floats, one attribute
    let primitive_assembler = PrimitiveAssemblerDesc::Vertex {
        buffers: &[pso::VertexBufferDesc {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            rate: VertexInputRate::Vertex,
        }],
        attributes: &[pso::AttributeDesc {
            location: 0,
            binding: 0,
            element: pso::Element {
                format: format::Format::Rg32Sfloat,
                offset: 0,
            },
        }],
        input_assembler: InputAssemblerDesc::new(Primitive::TriangleList),
        vertex: vs_entry,
        tessellation: None,
        geometry: None,
    };

    let subpass = Subpass {
        index: 0,
        main_pass: render_pass,
    };

    let mut pipeline_desc = pso::GraphicsPipelineDesc::new(
        primitive_assembler,
        pso::Rasterizer::FILL,
        Some(fs_entry),
        pipeline_layout,
        subpass,
    );

    pipeline_desc.blender.targets.push(pso::ColorBlendDesc {
        mask: pso::ColorMask::ALL,
        blend: Some(pso::BlendState::ALPHA),
    });

    let pipeline = unsafe {
        device.create_graphics_pipeline(&pipeline_desc, pipeline_cache)
    };
    drop(pipeline_desc);

    unsafe {
        device.destroy_shader_module(vs_module);
        device.destroy_shader_module(fs_module);
    }

    pipeline.map_err(|err| PipelineError::Link(format!("{:?}", err)))
}

fn load_pipeline_cache<B: hal::Backend>(device: &B::Device) -> Option<B::PipelineCache> {
    let previous_pipeline_cache_data = std::fs::read(PIPELINE_CACHE_PATH);

    if let Err(error) = previous_pipeline_cache_data.as_ref() {
        log::info!("No previous pipeline cache at {}: {}", PIPELINE_CACHE_PATH, error);
    }

    let cache = unsafe {
        device.create_pipeline_cache(
            previous_pipeline_cache_data
                .as_ref()
                .ok()
                .map(|vec| &vec[..]),
        )
    };

    match cache {
        Ok(cache) => Some(cache),
        Err(err) => {
            log::error!("Can't create pipeline cache: {:?}", err);
            None
        }
    }
}

fn save_pipeline_cache<B: hal::Backend>(device: &B::Device, pipeline_cache: &B::PipelineCache) {
    let pipeline_cache_data = match unsafe { device.get_pipeline_cache_data(pipeline_cache) } {
        Ok(data) => data,
        Err(err) => {
            log::warn!("Can't read back the pipeline cache: {:?}", err);
            return;
        }
    };

    match std::fs::write(PIPELINE_CACHE_PATH, &pipeline_cache_data) {
        Ok(()) => log::info!(
            "Wrote the pipeline cache to {} ({} bytes)",
            PIPELINE_CACHE_PATH,
            pipeline_cache_data.len()
        ),
        Err(err) => log::warn!("Can't write the pipeline cache to {}: {}", PIPELINE_CACHE_PATH, err),
    }
}
