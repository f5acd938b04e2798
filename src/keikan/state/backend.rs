use crate::gpu::{
    self, AcquireOutcome, Extent, FrameCommands, FrameUniforms, GpuBackend, GpuError,
    InstanceData, PipelineStatistics, PresentOutcome, SceneUpload, SurfaceCapabilities,
    SwapchainDesc,
};
use crate::model::Vertex;
use std::mem;
use std::os::raw::c_void;
use std::sync::Arc;
use std::time::Duration;
use vulkano::buffer::{BufferAccess, BufferSlice, BufferUsage, CpuAccessibleBuffer, CpuBufferPool};
use vulkano::command_buffer::pool::standard::StandardCommandPoolAlloc;
use vulkano::command_buffer::sys::{
    Flags, UnsafeCommandBuffer, UnsafeCommandBufferBuilder,
    UnsafeCommandBufferBuilderExecuteCommands,
};
use vulkano::command_buffer::{
    AutoCommandBuffer, AutoCommandBufferBuilder, CommandBuffer, CommandBufferExecError,
    DynamicState, Kind, KindOcclusionQuery, SubpassContents,
};
use vulkano::descriptor::descriptor_set::PersistentDescriptorSet;
use vulkano::descriptor::PipelineLayoutAbstract;
use vulkano::device::{Device, DeviceOwned, Queue};
use vulkano::format::{ClearValue, Format};
use vulkano::framebuffer::{Framebuffer, FramebufferAbstract, RenderPassAbstract, Subpass};
use vulkano::image::{AttachmentImage, ImageAccess, ImageLayout, ImageUsage, SwapchainImage};
use vulkano::pipeline::vertex::OneVertexOneInstanceDefinition;
use vulkano::pipeline::{viewport::Viewport, GraphicsPipeline};
use vulkano::query::{QueryPipelineStatisticFlags, QueryType, UnsafeQueryPool};
use vulkano::swapchain::{
    self, AcquireError, ColorSpace, FullscreenExclusive, PresentMode, Surface, Swapchain,
};
use vulkano::sync::{
    self, AccessCheckError, AccessFlagBits, FenceSignalFuture, FlushError, GpuFuture,
    PipelineStages, SharingMode,
};
use vulkano::VulkanObject;
use winit::window::Window;

mod vertex_shader {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "src/keikan/state/shaders/scene.vert"
    }
}

mod fragment_shader {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "src/keikan/state/shaders/scene.frag"
    }
}

type SharedRenderPass = Arc<dyn RenderPassAbstract + Send + Sync>;

type ConcreteGraphicsPipeline = GraphicsPipeline<
    OneVertexOneInstanceDefinition<Vertex, InstanceData>,
    Box<dyn PipelineLayoutAbstract + Send + Sync + 'static>,
    Arc<dyn RenderPassAbstract + Send + Sync + 'static>,
>;

const DEPTH_FORMAT: Format = Format::D16Unorm;

/// `UnsafeQueryPool::queries_range` rejects a range ending on the last slot,
/// so the single statistics query gets a spare slot behind it.
const STATISTICS_QUERY_SLOTS: u32 = 2;
const STATISTICS_COUNTERS: usize = 6;

fn statistics_flags() -> QueryPipelineStatisticFlags {
    QueryPipelineStatisticFlags {
        input_assembly_vertices: true,
        input_assembly_primitives: true,
        vertex_shader_invocations: true,
        clipping_invocations: true,
        clipping_primitives: true,
        fragment_shader_invocations: true,
        ..QueryPipelineStatisticFlags::none()
    }
}

/// Counters come back in flag bit order.
fn statistics_from_counters(counters: [u64; STATISTICS_COUNTERS]) -> PipelineStatistics {
    PipelineStatistics {
        input_assembly_vertices: counters[0],
        input_assembly_primitives: counters[1],
        vertex_shader_invocations: counters[2],
        clipping_invocations: counters[3],
        clipping_primitives: counters[4],
        fragment_shader_invocations: counters[5],
    }
}

fn present_mode_to_vk(mode: gpu::PresentMode) -> PresentMode {
    match mode {
        gpu::PresentMode::Immediate => PresentMode::Immediate,
        gpu::PresentMode::Mailbox => PresentMode::Mailbox,
        gpu::PresentMode::Fifo => PresentMode::Fifo,
        gpu::PresentMode::FifoRelaxed => PresentMode::Relaxed,
    }
}

fn extent_from_vk(extent: [u32; 2]) -> Extent {
    Extent::new(extent[0], extent[1])
}

fn missing(context: &'static str, what: &str) -> GpuError {
    GpuError::Backend {
        context,
        message: format!("{} is not initialized", what),
    }
}

fn out_of_range(context: &'static str) -> GpuError {
    GpuError::Backend {
        context,
        message: "draw range outside of the scene buffers".into(),
    }
}

fn choose_swap_surface_format(available_formats: &[(Format, ColorSpace)]) -> Option<(Format, ColorSpace)> {
    available_formats
        .iter()
        .find(|(format, color_space)| {
            *format == Format::B8G8R8A8Unorm && *color_space == ColorSpace::SrgbNonLinear
        })
        .or_else(|| available_formats.first())
        .copied()
}

pub struct VulkanSwapchain {
    swapchain: Arc<Swapchain<Window>>,
    images: Vec<Arc<SwapchainImage<Window>>>,
    depth_buffer: Arc<AttachmentImage>,
}

pub struct VulkanFramebuffer(Arc<dyn FramebufferAbstract + Send + Sync>);

/// One pipeline statistics query, owned by a single framebuffer.
pub struct StatisticsPool(UnsafeQueryPool);

/// Primary command buffer recorded by hand around the scene draws, so the
/// statistics query can enclose the render pass. vulkano's automatic builder
/// has no query commands. Resource locking is delegated to the secondary
/// buffer holding the draws; attachments are synchronized by the acquire
/// and present futures.
struct StatisticsCommandBuffer {
    primary: UnsafeCommandBuffer<StandardCommandPoolAlloc>,
    draws: AutoCommandBuffer,
    _framebuffer: Arc<dyn FramebufferAbstract + Send + Sync>,
}

unsafe impl DeviceOwned for StatisticsCommandBuffer {
    fn device(&self) -> &Arc<Device> {
        self.draws.device()
    }
}

unsafe impl CommandBuffer for StatisticsCommandBuffer {
    type PoolAlloc = StandardCommandPoolAlloc;

    fn inner(&self) -> &UnsafeCommandBuffer<StandardCommandPoolAlloc> {
        &self.primary
    }

    fn lock_submit(
        &self,
        future: &dyn GpuFuture,
        queue: &Queue,
    ) -> Result<(), CommandBufferExecError> {
        self.draws.lock_submit(future, queue)
    }

    unsafe fn unlock(&self) {
        self.draws.unlock();
    }

    fn check_buffer_access(
        &self,
        buffer: &dyn BufferAccess,
        exclusive: bool,
        queue: &Queue,
    ) -> Result<Option<(PipelineStages, AccessFlagBits)>, AccessCheckError> {
        self.draws.check_buffer_access(buffer, exclusive, queue)
    }

    fn check_image_access(
        &self,
        _image: &dyn ImageAccess,
        _layout: ImageLayout,
        _exclusive: bool,
        _queue: &Queue,
    ) -> Result<Option<(PipelineStages, AccessFlagBits)>, AccessCheckError> {
        Err(AccessCheckError::Unknown)
    }

    fn kind(&self) -> Kind<&dyn RenderPassAbstract, &dyn FramebufferAbstract> {
        Kind::Primary
    }
}

/// GPU work that a later submission or present must wait on.
#[derive(Default)]
pub struct FutureSlot(Option<Box<dyn GpuFuture>>);

type SubmitFuture = FenceSignalFuture<Box<dyn GpuFuture>>;

#[derive(Default)]
pub struct FrameFence(Option<Arc<SubmitFuture>>);

struct ScenePipeline {
    pipeline: Arc<ConcreteGraphicsPipeline>,
    subpass: Subpass<SharedRenderPass>,
    vertex_buffer: Option<Arc<CpuAccessibleBuffer<[Vertex]>>>,
    index_buffer: Option<Arc<CpuAccessibleBuffer<[u32]>>>,
    uniform_pool: CpuBufferPool<FrameUniforms>,
    instance_pool: CpuBufferPool<InstanceData>,
}

fn clear_values(frame: &FrameCommands) -> Vec<ClearValue> {
    vec![frame.clear_color.into(), 1f32.into()]
}

impl ScenePipeline {
    fn record_draws(
        &self,
        builder: &mut AutoCommandBufferBuilder,
        frame: &FrameCommands,
    ) -> Result<(), GpuError> {
        let dynamic_state = DynamicState {
            viewports: Some(vec![Viewport {
                origin: [0.0, 0.0],
                dimensions: [frame.extent.width as f32, frame.extent.height as f32],
                depth_range: 0.0..1.0,
            }]),
            ..DynamicState::none()
        };

        if let Some(vertex_buffer) = self.vertex_buffer.as_ref().filter(|_| !frame.draws.is_empty()) {
            let layout = self
                .pipeline
                .layout()
                .descriptor_set_layout(0)
                .ok_or_else(|| missing("descriptor set", "set 0 layout"))?;
            let uniforms = self
                .uniform_pool
                .next(frame.uniforms)
                .map_err(GpuError::backend("uniform buffer"))?;
            let set = Arc::new(
                PersistentDescriptorSet::start(layout.clone())
                    .add_buffer(uniforms)
                    .map_err(GpuError::backend("descriptor set"))?
                    .build()
                    .map_err(GpuError::backend("descriptor set"))?,
            );
            let instances = Arc::new(
                self.instance_pool
                    .chunk(frame.instances.iter().copied())
                    .map_err(GpuError::backend("instance buffer"))?,
            );

            for draw in &frame.draws {
                let vertices = BufferSlice::from_typed_buffer_access(vertex_buffer.clone())
                    .slice(draw.vertex_offset..draw.vertex_offset + draw.vertex_count)
                    .ok_or_else(|| out_of_range("draw"))?;
                let instance = BufferSlice::from_typed_buffer_access(instances.clone())
                    .slice(draw.instance..draw.instance + 1)
                    .ok_or_else(|| out_of_range("draw"))?;
                match (&self.index_buffer, draw.index_count) {
                    (Some(index_buffer), count) if count > 0 => {
                        let indices = BufferSlice::from_typed_buffer_access(index_buffer.clone())
                            .slice(draw.index_offset..draw.index_offset + count)
                            .ok_or_else(|| out_of_range("draw indexed"))?;
                        builder
                            .draw_indexed(
                                self.pipeline.clone(),
                                &dynamic_state,
                                (vertices, instance),
                                indices,
                                set.clone(),
                                (),
                            )
                            .map_err(GpuError::backend("draw indexed"))?;
                    }
                    _ => {
                        builder
                            .draw(
                                self.pipeline.clone(),
                                &dynamic_state,
                                (vertices, instance),
                                set.clone(),
                                (),
                            )
                            .map_err(GpuError::backend("draw"))?;
                    }
                }
            }
        }

        Ok(())
    }

    fn record(
        &self,
        device: &Arc<Device>,
        queue: &Arc<Queue>,
        frame: &FrameCommands,
        framebuffer: &Arc<dyn FramebufferAbstract + Send + Sync>,
    ) -> Result<AutoCommandBuffer, GpuError> {
        let mut builder =
            AutoCommandBufferBuilder::primary_one_time_submit(device.clone(), queue.family())
                .map_err(GpuError::backend("command buffer"))?;
        builder
            .begin_render_pass(framebuffer.clone(), SubpassContents::Inline, clear_values(frame))
            .map_err(GpuError::backend("begin render pass"))?;
        self.record_draws(&mut builder, frame)?;
        builder
            .end_render_pass()
            .map_err(GpuError::backend("end render pass"))?;
        builder.build().map_err(GpuError::backend("command buffer"))
    }

    /// Same frame as [`ScenePipeline::record`], with the render pass enclosed
    /// in a pipeline statistics query on `pool`.
    fn record_with_statistics(
        &self,
        device: &Arc<Device>,
        queue: &Arc<Queue>,
        frame: &FrameCommands,
        framebuffer: &Arc<dyn FramebufferAbstract + Send + Sync>,
        pool: &StatisticsPool,
    ) -> Result<StatisticsCommandBuffer, GpuError> {
        let mut draws = AutoCommandBufferBuilder::secondary_graphics_one_time_submit_inherit_queries(
            device.clone(),
            queue.family(),
            self.subpass.clone(),
            KindOcclusionQuery::Forbidden,
            statistics_flags(),
        )
        .map_err(GpuError::backend("secondary command buffer"))?;
        self.record_draws(&mut draws, frame)?;
        let draws = draws
            .build()
            .map_err(GpuError::backend("secondary command buffer"))?;

        let pool = &pool.0;
        let reset = pool
            .queries_range(0, 1)
            .ok_or_else(|| missing("statistics", "query range"))?;
        let begin = pool.query(0).ok_or_else(|| missing("statistics", "query"))?;
        let end = pool.query(0).ok_or_else(|| missing("statistics", "query"))?;
        let command_pool = Device::standard_command_pool(device, queue.family());

        let primary = unsafe {
            let mut builder =
                UnsafeCommandBufferBuilder::new(&command_pool, Kind::primary(), Flags::OneTimeSubmit)
                    .map_err(GpuError::backend("command buffer"))?;
            builder.reset_query_pool(reset);
            builder.begin_query(begin, false);
            builder.begin_render_pass(
                framebuffer,
                SubpassContents::SecondaryCommandBuffers,
                clear_values(frame).into_iter(),
            );
            let mut commands = UnsafeCommandBufferBuilderExecuteCommands::new();
            commands.add(&draws);
            builder.execute_commands(commands);
            builder.end_render_pass();
            builder.end_query(end);
            builder.build().map_err(GpuError::backend("command buffer"))?
        };

        Ok(StatisticsCommandBuffer {
            primary,
            draws,
            _framebuffer: framebuffer.clone(),
        })
    }
}

/// Everything the render thread owns on the device. Futures are not `Send`,
/// so this is built on the thread that uses it.
pub struct VulkanState {
    device: Arc<Device>,
    graphics_queue: Arc<Queue>,
    present_queue: Arc<Queue>,
    surface: Arc<Surface<Window>>,
    surface_format: Option<(Format, ColorSpace)>,
    render_pass: Option<Arc<dyn RenderPassAbstract + Send + Sync>>,
    pipeline: Option<ScenePipeline>,
    previous_frame_end: Option<Box<dyn GpuFuture>>,
}

impl VulkanState {
    pub fn new(
        device: Arc<Device>,
        graphics_queue: Arc<Queue>,
        present_queue: Arc<Queue>,
        surface: Arc<Surface<Window>>,
    ) -> Self {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        let previous_frame_end = Some(sync::now(device.clone()).boxed());
        VulkanState {
            device,
            graphics_queue,
            present_queue,
            surface,
            surface_format: None,
            render_pass: None,
            pipeline: None,
            previous_frame_end,
        }
    }

    fn capabilities(&self) -> Result<swapchain::Capabilities, GpuError> {
        self.surface
            .capabilities(self.device.physical_device())
            .map_err(GpuError::backend("surface capabilities"))
    }

    fn render_pass(&self, context: &'static str) -> Result<&Arc<dyn RenderPassAbstract + Send + Sync>, GpuError> {
        self.render_pass
            .as_ref()
            .ok_or_else(|| missing(context, "render pass"))
    }

    fn sharing_mode(&self) -> SharingMode {
        if self.graphics_queue.family().id() != self.present_queue.family().id() {
            vec![&self.graphics_queue, &self.present_queue].as_slice().into()
        } else {
            (&self.graphics_queue).into()
        }
    }
}

impl GpuBackend for VulkanState {
    type Swapchain = VulkanSwapchain;
    type Framebuffer = VulkanFramebuffer;
    type QueryPool = StatisticsPool;
    type Semaphore = FutureSlot;
    type Fence = FrameFence;

    fn surface_capabilities(&mut self) -> Result<SurfaceCapabilities, GpuError> {
        let capabilities = self.capabilities()?;
        let modes = capabilities.present_modes;
        let present_modes = [
            (modes.immediate, gpu::PresentMode::Immediate),
            (modes.mailbox, gpu::PresentMode::Mailbox),
            (modes.fifo, gpu::PresentMode::Fifo),
            (modes.relaxed, gpu::PresentMode::FifoRelaxed),
        ]
        .iter()
        .filter(|(supported, _)| *supported)
        .map(|(_, mode)| *mode)
        .collect();
        Ok(SurfaceCapabilities {
            min_image_count: capabilities.min_image_count,
            max_image_count: capabilities.max_image_count,
            current_extent: capabilities.current_extent.map(extent_from_vk),
            min_extent: extent_from_vk(capabilities.min_image_extent),
            max_extent: extent_from_vk(capabilities.max_image_extent),
            present_modes,
        })
    }

    fn init_render_pass(&mut self) -> Result<(), GpuError> {
        let capabilities = self.capabilities()?;
        let (color_format, color_space) = choose_swap_surface_format(&capabilities.supported_formats)
            .ok_or_else(|| missing("render pass", "surface format"))?;
        log::debug!("surface format {:?} {:?}", color_format, color_space);
        let render_pass: Arc<dyn RenderPassAbstract + Send + Sync> = Arc::new(
            vulkano::single_pass_renderpass!(self.device.clone(),
            attachments: {
                color: {
                    load: Clear,
                    store: Store,
                    format: color_format,
                    samples: 1,
                    initial_layout: ImageLayout::Undefined,
                    final_layout: ImageLayout::PresentSrc,
                },
                depth: {
                    load: Clear,
                    store: DontCare,
                    format: DEPTH_FORMAT,
                    samples: 1,
                    initial_layout: ImageLayout::Undefined,
                    final_layout: ImageLayout::DepthStencilAttachmentOptimal,
                }
            },
            pass: {
                color: [color],
                depth_stencil: {depth}
            }
            )
            .map_err(GpuError::backend("render pass"))?,
        );
        self.surface_format = Some((color_format, color_space));
        self.render_pass = Some(render_pass);
        Ok(())
    }

    fn deinit_render_pass(&mut self) {
        self.render_pass = None;
        self.surface_format = None;
    }

    fn build_pipeline(&mut self, upload: &SceneUpload) -> Result<(), GpuError> {
        let render_pass = self.render_pass("pipeline")?.clone();
        let vert_shader_module = vertex_shader::Shader::load(self.device.clone())
            .map_err(GpuError::backend("vertex shader"))?;
        let frag_shader_module = fragment_shader::Shader::load(self.device.clone())
            .map_err(GpuError::backend("fragment shader"))?;
        let subpass = Subpass::from(render_pass, 0).ok_or_else(|| missing("pipeline", "subpass"))?;

        let pipeline = GraphicsPipeline::start()
            .vertex_input(OneVertexOneInstanceDefinition::<Vertex, InstanceData>::new())
            .vertex_shader(vert_shader_module.main_entry_point(), ())
            .triangle_list()
            .viewports_dynamic_scissors_irrelevant(1)
            .fragment_shader(frag_shader_module.main_entry_point(), ())
            .depth_stencil_simple_depth()
            .render_pass(subpass.clone())
            .build(self.device.clone())
            .map_err(GpuError::backend("pipeline"))?;

        let vertex_buffer = if upload.vertices.is_empty() {
            None
        } else {
            Some(
                CpuAccessibleBuffer::from_iter(
                    self.device.clone(),
                    BufferUsage::vertex_buffer(),
                    false,
                    upload.vertices.iter().copied(),
                )
                .map_err(GpuError::backend("vertex buffer"))?,
            )
        };
        let index_buffer = if upload.indices.is_empty() {
            None
        } else {
            Some(
                CpuAccessibleBuffer::from_iter(
                    self.device.clone(),
                    BufferUsage::index_buffer(),
                    false,
                    upload.indices.iter().copied(),
                )
                .map_err(GpuError::backend("index buffer"))?,
            )
        };

        self.pipeline = Some(ScenePipeline {
            pipeline: Arc::new(pipeline),
            subpass,
            vertex_buffer,
            index_buffer,
            uniform_pool: CpuBufferPool::uniform_buffer(self.device.clone()),
            instance_pool: CpuBufferPool::vertex_buffer(self.device.clone()),
        });
        Ok(())
    }

    fn destroy_pipeline(&mut self) {
        self.pipeline = None;
    }

    fn create_swapchain(
        &mut self,
        desc: &SwapchainDesc,
        old: Option<VulkanSwapchain>,
    ) -> Result<(VulkanSwapchain, usize), GpuError> {
        let capabilities = self.capabilities()?;
        let (format, color_space) = self
            .surface_format
            .ok_or_else(|| missing("swapchain", "surface format"))?;
        let alpha = capabilities
            .supported_composite_alpha
            .iter()
            .next()
            .ok_or_else(|| missing("swapchain", "composite alpha"))?;
        let image_usage = ImageUsage {
            color_attachment: true,
            ..ImageUsage::none()
        };
        let extent = desc.extent.as_array();
        let present_mode = present_mode_to_vk(desc.present_mode);

        let created = match old {
            Some(old) => Swapchain::with_old_swapchain(
                self.device.clone(),
                self.surface.clone(),
                desc.image_count,
                format,
                extent,
                1,
                image_usage,
                self.sharing_mode(),
                capabilities.current_transform,
                alpha,
                present_mode,
                FullscreenExclusive::Default,
                true,
                color_space,
                old.swapchain,
            ),
            None => Swapchain::new(
                self.device.clone(),
                self.surface.clone(),
                desc.image_count,
                format,
                extent,
                1,
                image_usage,
                self.sharing_mode(),
                capabilities.current_transform,
                alpha,
                present_mode,
                FullscreenExclusive::Default,
                true,
                color_space,
            ),
        };
        let (swapchain, images) = created.map_err(GpuError::backend("swapchain"))?;
        let depth_buffer = AttachmentImage::transient(self.device.clone(), extent, DEPTH_FORMAT)
            .map_err(GpuError::backend("depth buffer"))?;
        let image_count = images.len();
        Ok((
            VulkanSwapchain {
                swapchain,
                images,
                depth_buffer,
            },
            image_count,
        ))
    }

    fn destroy_swapchain(&mut self, swapchain: VulkanSwapchain) {
        drop(swapchain);
    }

    fn create_framebuffer(
        &mut self,
        swapchain: &VulkanSwapchain,
        image: usize,
    ) -> Result<VulkanFramebuffer, GpuError> {
        let render_pass = self.render_pass("framebuffer")?.clone();
        let image = swapchain
            .images
            .get(image)
            .ok_or_else(|| missing("framebuffer", "swapchain image"))?;
        let framebuffer = Framebuffer::start(render_pass)
            .add(image.clone())
            .map_err(GpuError::backend("framebuffer"))?
            .add(swapchain.depth_buffer.clone())
            .map_err(GpuError::backend("framebuffer"))?
            .build()
            .map_err(GpuError::backend("framebuffer"))?;
        Ok(VulkanFramebuffer(Arc::new(framebuffer)))
    }

    fn destroy_framebuffer(&mut self, framebuffer: VulkanFramebuffer) {
        drop(framebuffer);
    }

    fn supports_pipeline_statistics(&self) -> bool {
        self.device.enabled_features().pipeline_statistics_query
    }

    fn create_query_pool(&mut self) -> Result<StatisticsPool, GpuError> {
        if !self.supports_pipeline_statistics() {
            return Err(GpuError::Unsupported("pipeline statistics queries"));
        }
        UnsafeQueryPool::new(
            self.device.clone(),
            QueryType::PipelineStatistics(statistics_flags()),
            STATISTICS_QUERY_SLOTS,
        )
        .map(StatisticsPool)
        .map_err(GpuError::backend("query pool"))
    }

    fn destroy_query_pool(&mut self, pool: StatisticsPool) {
        drop(pool);
    }

    fn read_statistics(&mut self, pool: &StatisticsPool) -> Result<PipelineStatistics, GpuError> {
        let mut counters = [0u64; STATISTICS_COUNTERS];
        let size = mem::size_of_val(&counters);
        // The pool and its device outlive the call; the buffer holds exactly one result.
        let result = unsafe {
            self.device.pointers().GetQueryPoolResults(
                self.device.internal_object(),
                pool.0.internal_object(),
                0,
                1,
                size,
                counters.as_mut_ptr() as *mut c_void,
                size as vk_sys::DeviceSize,
                vk_sys::QUERY_RESULT_64_BIT | vk_sys::QUERY_RESULT_WAIT_BIT,
            )
        };
        if result != vk_sys::SUCCESS {
            return Err(GpuError::Backend {
                context: "read statistics",
                message: format!("vkGetQueryPoolResults returned {}", result),
            });
        }
        Ok(statistics_from_counters(counters))
    }

    fn create_semaphore(&mut self) -> Result<FutureSlot, GpuError> {
        Ok(FutureSlot::default())
    }

    fn destroy_semaphore(&mut self, semaphore: FutureSlot) {
        drop(semaphore);
    }

    fn create_fence(&mut self) -> Result<FrameFence, GpuError> {
        Ok(FrameFence::default())
    }

    fn destroy_fence(&mut self, fence: FrameFence) {
        drop(fence);
    }

    fn wait_fence(&mut self, fence: &mut FrameFence) -> Result<(), GpuError> {
        match &fence.0 {
            Some(future) => future.wait(None).map_err(GpuError::backend("wait fence")),
            None => Ok(()),
        }
    }

    fn reset_fence(&mut self, fence: &mut FrameFence) -> Result<(), GpuError> {
        fence.0 = None;
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &VulkanSwapchain,
        timeout: Duration,
        signal: &mut FutureSlot,
    ) -> Result<AcquireOutcome, GpuError> {
        match swapchain::acquire_next_image(swapchain.swapchain.clone(), Some(timeout)) {
            Ok((image, suboptimal, acquire_future)) => {
                let mut previous = match self.previous_frame_end.take() {
                    Some(previous) => previous,
                    None => sync::now(self.device.clone()).boxed(),
                };
                previous.cleanup_finished();
                signal.0 = Some(previous.join(acquire_future).boxed());
                Ok(AcquireOutcome::Acquired { image, suboptimal })
            }
            Err(AcquireError::OutOfDate) => Ok(AcquireOutcome::OutOfDate),
            Err(AcquireError::Timeout) => Ok(AcquireOutcome::Timeout),
            Err(e) => Err(GpuError::backend("acquire next image")(e)),
        }
    }

    fn submit(
        &mut self,
        frame: &FrameCommands,
        framebuffer: &VulkanFramebuffer,
        query_pool: Option<&StatisticsPool>,
        wait: &mut FutureSlot,
        signal: &mut FutureSlot,
        fence: &mut FrameFence,
    ) -> Result<(), GpuError> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| missing("submit", "pipeline"))?;
        let previous = wait
            .0
            .take()
            .ok_or_else(|| missing("submit", "acquired image"))?;
        let executed = match query_pool {
            Some(pool) => {
                let command_buffer = pipeline.record_with_statistics(
                    &self.device,
                    &self.graphics_queue,
                    frame,
                    &framebuffer.0,
                    pool,
                )?;
                previous
                    .then_execute(self.graphics_queue.clone(), command_buffer)
                    .map_err(GpuError::backend("execute"))?
                    .boxed()
            }
            None => {
                let command_buffer =
                    pipeline.record(&self.device, &self.graphics_queue, frame, &framebuffer.0)?;
                previous
                    .then_execute(self.graphics_queue.clone(), command_buffer)
                    .map_err(GpuError::backend("execute"))?
                    .boxed()
            }
        };
        let future = executed
            .then_signal_fence_and_flush()
            .map_err(GpuError::backend("flush"))?;
        let future = Arc::new(future);
        fence.0 = Some(future.clone());
        signal.0 = Some(Box::new(future));
        Ok(())
    }

    fn present(
        &mut self,
        swapchain: &VulkanSwapchain,
        image: usize,
        wait: &mut FutureSlot,
    ) -> Result<PresentOutcome, GpuError> {
        let rendered = wait
            .0
            .take()
            .ok_or_else(|| missing("present", "rendered frame"))?;
        let future = rendered
            .then_swapchain_present(
                self.present_queue.clone(),
                swapchain.swapchain.clone(),
                image,
            )
            .then_signal_fence_and_flush();
        match future {
            Ok(future) => {
                self.previous_frame_end = Some(future.boxed());
                Ok(PresentOutcome::Presented)
            }
            Err(FlushError::OutOfDate) => {
                self.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
                Ok(PresentOutcome::OutOfDate)
            }
            Err(e) => {
                self.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
                Err(GpuError::backend("present")(e))
            }
        }
    }

    fn wait_idle(&mut self) -> Result<(), GpuError> {
        // Only this thread submits to the device's queues.
        unsafe { self.device.wait() }.map_err(GpuError::backend("wait idle"))?;
        self.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_query_counts_six_pipeline_stages() {
        let bits: vk_sys::QueryPipelineStatisticFlags = statistics_flags().into();
        assert_eq!(bits, 0b1110_0111);
        assert_eq!(bits.count_ones() as usize, STATISTICS_COUNTERS);
    }

    #[test]
    fn counters_map_to_statistics_in_flag_order() {
        let statistics = statistics_from_counters([1, 2, 3, 4, 5, 6]);
        assert_eq!(statistics.input_assembly_vertices, 1);
        assert_eq!(statistics.input_assembly_primitives, 2);
        assert_eq!(statistics.vertex_shader_invocations, 3);
        assert_eq!(statistics.clipping_invocations, 4);
        assert_eq!(statistics.clipping_primitives, 5);
        assert_eq!(statistics.fragment_shader_invocations, 6);
    }
}
