#[cfg(feature = "dx11")]
extern crate gfx_backend_dx11 as back;
#[cfg(feature = "dx12")]
extern crate gfx_backend_dx12 as back;
#[cfg(not(any(
    feature = "vulkan",
    feature = "dx11",
    feature = "dx12",
    feature = "metal",
    feature = "gl",
)))]
extern crate gfx_backend_empty as back;
#[cfg(feature = "gl")]
extern crate gfx_backend_gl as back;
#[cfg(feature = "metal")]
extern crate gfx_backend_metal as back;
#[cfg(feature = "vulkan")]
extern crate gfx_backend_vulkan as back;


mod renderer;
mod entities;
mod error;
mod pipelines;

use error::InitError;
use renderer::Renderer;

use gfx_hal as hal;
use hal::{
    prelude::*,
    window,
};


#[cfg_attr(rustfmt, rustfmt_skip)]
pub const DIMS: window::Extent2D = window::Extent2D { width: 800, height: 600 };
pub const TITLE: &str = "gfx quad";
pub const CLEAR_COLOR: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

fn main() {
    env_logger::init();

    #[cfg(not(any(
        feature = "vulkan",
        feature = "dx11",
        feature = "dx12",
        feature = "metal",
        feature = "gl",
    )))]
    log::warn!(
        "You are running the example with the empty backend, no graphical output is to be expected"
    );

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), InitError> {
    let event_loop = winit::event_loop::EventLoop::new();

    let window_builder = winit::window::WindowBuilder::new()
        .with_min_inner_size(winit::dpi::Size::Logical(winit::dpi::LogicalSize::new(
            64.0, 64.0,
        )))
        .with_inner_size(winit::dpi::Size::Physical(winit::dpi::PhysicalSize::new(
            DIMS.width,
            DIMS.height,
        )))
        .with_title(TITLE.to_string());

    // instantiate backend
    let window = window_builder.build(&event_loop)?;

    let instance = back::Instance::create(TITLE, 1)
        .map_err(|err| InitError::Backend(format!("{:?}", err)))?;

    let surface = unsafe { instance.create_surface(&window) }
        .map_err(|err| InitError::Surface(format!("{:?}", err)))?;

    let adapter = {
        let mut adapters = instance.enumerate_adapters();
        for adapter in &adapters {
            log::info!("{:?}", adapter.info);
        }
        if adapters.is_empty() {
            return Err(InitError::NoAdapter);
        }
        adapters.remove(0)
    };

    let mut renderer = Renderer::new(instance, surface, adapter)?;

    renderer.render();

    // It is important that the closure move captures the Renderer,
    // otherwise it will not be dropped when the event loop exits.
    event_loop.run(move |event, _, control_flow| {
        *control_flow = winit::event_loop::ControlFlow::Poll;

        match event {
            winit::event::Event::WindowEvent { event, .. } => {
                match event {

                    winit::event::WindowEvent::CloseRequested => {
                        *control_flow = winit::event_loop::ControlFlow::Exit
                    }

                    winit::event::WindowEvent::KeyboardInput {
                        input:
                            winit::event::KeyboardInput {
                                virtual_keycode: Some(winit::event::VirtualKeyCode::Escape),
                                ..
                            },
                        ..
                    } => *control_flow = winit::event_loop::ControlFlow::Exit,

                    winit::event::WindowEvent::Resized(dims) => {
                        log::info!("resized to {:?}", dims);
                        renderer.dimensions_set(window::Extent2D {
                            width: dims.width,
                            height: dims.height,
                        });
                        renderer.recreate_swapchain();
                    }

                    _ => {}
                }
            },
            winit::event::Event::RedrawEventsCleared => {
                renderer.render();
            }
            _ => {}
        }
    });
}
