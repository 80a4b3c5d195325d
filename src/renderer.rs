
use crate::entities::{Vertex, QUAD};
use crate::error::InitError;
use crate::pipelines::{self, Pipeline};

use std::rc::Rc;
use gfx_hal as hal;

use hal::{
    buffer, command, format,
    format::ChannelType,
    memory,
    pool,
    prelude::*,
    pso,
    queue::QueueGroup,
    window,
};

use std::{
    borrow::Borrow,
    iter,
    mem::{self, ManuallyDrop},
    ptr,
};

use super::{CLEAR_COLOR, DIMS};

// Maximum number of frames the CPU records ahead of the GPU. Each one gets its
// own command pool, fence and semaphore.
const FRAMES_IN_FLIGHT: usize = 3;

pub struct Renderer<B: hal::Backend> {
    surface: ManuallyDrop<B::Surface>,
    format: hal::format::Format,
    dimensions: window::Extent2D,
    viewport: pso::Viewport,
    render_pass: ManuallyDrop<B::RenderPass>,
    framebuffer: ManuallyDrop<B::Framebuffer>,
    pipeline: Option<Pipeline<B>>,
    submission_complete_semaphores: Vec<B::Semaphore>,
    submission_complete_fences: Vec<B::Fence>,
    cmd_pools: Vec<B::CommandPool>,
    cmd_buffers: Vec<B::CommandBuffer>,
    vertex_buffer: ManuallyDrop<B::Buffer>,
    vertex_buffer_memory: ManuallyDrop<B::Memory>,
    frame: u64,
    // These members are dropped in the declaration order.
    device: Rc<B::Device>,
    adapter: hal::adapter::Adapter<B>,
    queue_group: QueueGroup<B>,
    instance: B::Instance,
}

impl<B> Renderer<B>
where
    B: hal::Backend,
{
    pub fn new(
        instance: B::Instance,
        mut surface: B::Surface,
        adapter: hal::adapter::Adapter<B>,
    ) -> Result<Renderer<B>, InitError> {
        let memory_types = adapter.physical_device.memory_properties().memory_types;

        // Build a new device and associated command queues
        let family = adapter
            .queue_families
            .iter()
            .find(|family| {
                surface.supports_queue_family(family) && family.queue_type().supports_graphics()
            })
            .ok_or(InitError::NoQueueFamily)?;

        let mut gpu = unsafe {
            adapter
                .physical_device
                .open(&[(family, &[1.0])], hal::Features::empty())
        }
        .map_err(InitError::device("open the logical device"))?;

        let queue_group = gpu.queue_groups.pop().ok_or(InitError::NoQueueFamily)?;

        let device = Rc::new(gpu.device);

        log::debug!("Memory types: {:?}", memory_types);

        let (vertex_buffer, vertex_buffer_memory) =
            create_buffer::<B, Vertex>(&device, &memory_types, buffer::Usage::VERTEX, &QUAD)?;

        let caps = surface.capabilities(&adapter.physical_device);
        let formats = surface.supported_formats(&adapter.physical_device);
        log::info!("formats: {:?}", formats);
        let format = formats.map_or(format::Format::Rgba8Srgb, |formats| {
            formats
                .iter()
                .find(|format| format.base_format().1 == ChannelType::Srgb)
                .copied()
                .unwrap_or(formats[0])
        });

        let swap_config = window::SwapchainConfig::from_caps(&caps, format, DIMS);
        let fat = swap_config.framebuffer_attachment();
        log::info!("{:?}", swap_config);
        let extent = swap_config.extent;
        unsafe { surface.configure_swapchain(&*device, swap_config) }
            .map_err(InitError::device("configure swapchain"))?;

        let render_pass = pipelines::create_render_pass::<B>(&device, format)?;

        // A missing or broken shader is not fatal: frames are still cleared.
        let pipeline = match Pipeline::new(device.clone(), &render_pass) {
            Ok(pipeline) => Some(pipeline),
            Err(err) => {
                log::error!("{}", err);
                None
            }
        };

        let framebuffer = unsafe {
            device.create_framebuffer(&render_pass, iter::once(fat), extent.to_extent())
        }
        .map_err(InitError::device("create framebuffer"))?;

        let mut submission_complete_semaphores = Vec::with_capacity(FRAMES_IN_FLIGHT);
        let mut submission_complete_fences = Vec::with_capacity(FRAMES_IN_FLIGHT);
        let mut cmd_pools = Vec::with_capacity(FRAMES_IN_FLIGHT);
        let mut cmd_buffers = Vec::with_capacity(FRAMES_IN_FLIGHT);

        for _ in 0..FRAMES_IN_FLIGHT {
            let mut cmd_pool = unsafe {
                device.create_command_pool(
                    queue_group.family,
                    pool::CommandPoolCreateFlags::empty(),
                )
            }
            .map_err(InitError::device("create command pool"))?;

            submission_complete_semaphores.push(
                device
                    .create_semaphore()
                    .map_err(InitError::device("create semaphore"))?,
            );
            submission_complete_fences.push(
                device
                    .create_fence(true)
                    .map_err(InitError::device("create fence"))?,
            );
            cmd_buffers.push(unsafe { cmd_pool.allocate_one(command::Level::Primary) });
            cmd_pools.push(cmd_pool);
        }

        // Rendering setup
        let viewport = pso::Viewport {
            rect: pso::Rect {
                x: 0,
                y: 0,
                w: extent.width as _,
                h: extent.height as _,
            },
            depth: 0.0..1.0,
        };

        Ok(Renderer {
            instance,
            device,
            queue_group,
            surface: ManuallyDrop::new(surface),
            adapter,
            format,
            dimensions: DIMS,
            viewport,
            render_pass: ManuallyDrop::new(render_pass),
            framebuffer: ManuallyDrop::new(framebuffer),
            pipeline,
            submission_complete_semaphores,
            submission_complete_fences,
            cmd_pools,
            cmd_buffers,
            vertex_buffer,
            vertex_buffer_memory,
            frame: 0,
        })
    }

    pub fn recreate_swapchain(&mut self) {
        let caps = self.surface.capabilities(&self.adapter.physical_device);
        let swap_config = window::SwapchainConfig::from_caps(&caps, self.format, self.dimensions);
        log::debug!("{:?}", swap_config);

        let extent = swap_config.extent.to_extent();
        self.viewport.rect.w = extent.width as _;
        self.viewport.rect.h = extent.height as _;

        if let Err(err) = self.device.wait_idle() {
            log::error!("Device lost while recreating the swapchain: {:?}", err);
            return;
        }

        unsafe {
            let framebuffer = self.device.create_framebuffer(
                &self.render_pass,
                iter::once(swap_config.framebuffer_attachment()),
                extent,
            );
            match framebuffer {
                Ok(framebuffer) => {
                    let old = mem::replace(&mut *self.framebuffer, framebuffer);
                    self.device.destroy_framebuffer(old);
                }
                Err(err) => log::error!("Can't create framebuffer: {:?}", err),
            }

            if let Err(err) = self.surface.configure_swapchain(&*self.device, swap_config) {
                log::error!("Can't create swapchain: {:?}", err);
            }
        }
    }

    /// Clears the surface and draws the quad, if the pipeline exists.
    pub fn render(&mut self) {
        let surface_image = unsafe {
            match self.surface.acquire_image(!0) {
                Ok((image, _)) => image,
                Err(_) => {
                    self.recreate_swapchain();
                    return;
                }
            }
        };

        // Index into the per-frame resource rings. Not the same thing as the
        // swapchain image index.
        let frame_idx = self.frame as usize % FRAMES_IN_FLIGHT;

        // Wait for the previous submission of this slot so at most
        // FRAMES_IN_FLIGHT frames are queued.
        unsafe {
            let fence = &mut self.submission_complete_fences[frame_idx];
            if let Err(err) = self.device.wait_for_fence(fence, !0) {
                log::error!("Failed to wait for fence: {:?}", err);
                return;
            }
            if let Err(err) = self.device.reset_fence(fence) {
                log::error!("Failed to reset fence: {:?}", err);
                return;
            }
            self.cmd_pools[frame_idx].reset(false);
        }

        let cmd_buffer = &mut self.cmd_buffers[frame_idx];
        unsafe {
            cmd_buffer.begin_primary(command::CommandBufferFlags::ONE_TIME_SUBMIT);

            cmd_buffer.set_viewports(0, iter::once(self.viewport.clone()));
            cmd_buffer.set_scissors(0, iter::once(self.viewport.rect));

            cmd_buffer.begin_render_pass(
                &self.render_pass,
                &self.framebuffer,
                self.viewport.rect,
                iter::once(command::RenderAttachmentInfo {
                    image_view: surface_image.borrow(),
                    clear_value: command::ClearValue {
                        color: command::ClearColor {
                            float32: CLEAR_COLOR,
                        },
                    },
                }),
                command::SubpassContents::Inline,
            );

            if let Some(pipeline) = self.pipeline.as_ref() {
                cmd_buffer.bind_graphics_pipeline(pipeline.pipeline());
                cmd_buffer.bind_vertex_buffers(
                    0,
                    iter::once((&*self.vertex_buffer, buffer::SubRange::WHOLE)),
                );
                cmd_buffer.draw(0..QUAD.len() as u32, 0..1);
            }

            cmd_buffer.end_render_pass();
            cmd_buffer.finish();

            self.queue_group.queues[0].submit(
                iter::once(&*cmd_buffer),
                iter::empty(),
                iter::once(&self.submission_complete_semaphores[frame_idx]),
                Some(&mut self.submission_complete_fences[frame_idx]),
            );

            let result = self.queue_group.queues[0].present(
                &mut self.surface,
                surface_image,
                Some(&mut self.submission_complete_semaphores[frame_idx]),
            );

            if result.is_err() {
                self.recreate_swapchain();
            }
        }

        self.frame += 1;
    }

    pub fn dimensions_set(&mut self, dimensions: window::Extent2D) {
        self.dimensions = dimensions;
    }
}

impl<B> Drop for Renderer<B>
where
    B: hal::Backend,
{
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            log::warn!("Device did not idle before teardown: {:?}", err);
        }

        // holds its own handle on the device; release it first
        self.pipeline = None;

        unsafe {
            self.device.destroy_buffer(ManuallyDrop::into_inner(ptr::read(&self.vertex_buffer)));

            for p in self.cmd_pools.drain(..) {
                self.device.destroy_command_pool(p);
            }

            for s in self.submission_complete_semaphores.drain(..) {
                self.device.destroy_semaphore(s);
            }

            for f in self.submission_complete_fences.drain(..) {
                self.device.destroy_fence(f);
            }

            self.device.destroy_framebuffer(ManuallyDrop::into_inner(ptr::read(&self.framebuffer)));
            self.device.destroy_render_pass(ManuallyDrop::into_inner(ptr::read(&self.render_pass)));

            self.surface.unconfigure_swapchain(&*self.device);

            self.device.free_memory(ManuallyDrop::into_inner(ptr::read(&self.vertex_buffer_memory)));

            self.instance.destroy_surface(ManuallyDrop::into_inner(ptr::read(&self.surface)));
        }
        log::info!("Renderer resources released");
    }
}

/// Creates a CPU-visible buffer and copies `src` into it.
fn create_buffer<B: hal::Backend, T>(
    device: &B::Device,
    memory_types: &[hal::adapter::MemoryType],
    usage: buffer::Usage,
    src: &[T],
) -> Result<(ManuallyDrop<B::Buffer>, ManuallyDrop<B::Memory>), InitError> {
    let buffer_stride = mem::size_of::<T>() as u64;
    let buffer_len = src.len() as u64 * buffer_stride;
    assert_ne!(buffer_len, 0);

    let mut buffer = unsafe {
        device.create_buffer(buffer_len, usage, memory::SparseFlags::empty())
    }
    .map_err(InitError::device("create buffer"))?;

    let buffer_req = unsafe { device.get_buffer_requirements(&buffer) };

    // type_mask has one bit per memory type the buffer may live in; take the
    // first allowed type that the CPU can map.
    let upload_type: hal::MemoryTypeId = memory_types
        .iter()
        .enumerate()
        .position(|(id, mem_type)| {
            buffer_req.type_mask & (1 << id) != 0
                && mem_type.properties.contains(memory::Properties::CPU_VISIBLE)
        })
        .ok_or(InitError::NoUploadMemory)?
        .into();

    let buffer_memory = unsafe {
        let mut buffer_memory = device
            .allocate_memory(upload_type, buffer_req.size)
            .map_err(InitError::device("allocate buffer memory"))?;
        device
            .bind_buffer_memory(&buffer_memory, 0, &mut buffer)
            .map_err(InitError::device("bind buffer memory"))?;

        let mapping = device
            .map_memory(&mut buffer_memory, memory::Segment::ALL)
            .map_err(InitError::device("map buffer memory"))?;

        ptr::copy_nonoverlapping(src.as_ptr() as *const u8, mapping, buffer_len as usize);
        device
            .flush_mapped_memory_ranges(iter::once((&buffer_memory, memory::Segment::ALL)))
            .map_err(InitError::device("flush buffer memory"))?;
        device.unmap_memory(&mut buffer_memory);
        buffer_memory
    };

    Ok((ManuallyDrop::new(buffer), ManuallyDrop::new(buffer_memory)))
}
