//! Seam between the frame machinery and the graphics API.
//!
//! Everything above this module talks to the GPU only through [`GpuBackend`];
//! handles are associated types so each backend keeps its own object model.

#[cfg(test)]
pub mod recording;

use crate::model::Vertex;
use crate::scene::lights::{LIGHTS_MAX, MATERIALS_MAX};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("{0} is not supported by this device")]
    Unsupported(&'static str),
    #[error("{context} failed: {message}")]
    Backend {
        context: &'static str,
        message: String,
    },
}

impl GpuError {
    /// Adapter for `map_err` on backend-specific error types.
    pub fn backend<E: fmt::Debug>(context: &'static str) -> impl FnOnce(E) -> GpuError {
        move |e| GpuError::Backend {
            context,
            message: format!("{:?}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Extent { width, height }
    }

    pub fn as_array(self) -> [u32; 2] {
        [self.width, self.height]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    Fifo,
    FifoRelaxed,
}

impl fmt::Display for PresentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PresentMode::Immediate => "immediate",
            PresentMode::Mailbox => "mailbox",
            PresentMode::Fifo => "fifo",
            PresentMode::FifoRelaxed => "fifo-relaxed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    pub max_image_count: Option<u32>,
    /// `None` when the surface lets the application pick the extent.
    pub current_extent: Option<Extent>,
    pub min_extent: Extent,
    pub max_extent: Extent,
    pub present_modes: Vec<PresentMode>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapchainDesc {
    pub image_count: u32,
    pub extent: Extent,
    pub present_mode: PresentMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image: usize, suboptimal: bool },
    OutOfDate,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatistics {
    pub input_assembly_vertices: u64,
    pub input_assembly_primitives: u64,
    pub vertex_shader_invocations: u64,
    pub clipping_invocations: u64,
    pub clipping_primitives: u64,
    pub fragment_shader_invocations: u64,
}

impl fmt::Display for PipelineStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IA vertices {}, IA primitives {}, VS invocations {}, clipping invocations {}, \
             clipping primitives {}, FS invocations {}",
            self.input_assembly_vertices,
            self.input_assembly_primitives,
            self.vertex_shader_invocations,
            self.clipping_invocations,
            self.clipping_primitives,
            self.fragment_shader_invocations
        )
    }
}

/// Per-object matrices, fed to the vertex shader as instance attributes.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct InstanceData {
    pub mv_matrix: [[f32; 4]; 4],
    pub mvp_matrix: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
}
vulkano::impl_vertex!(InstanceData, mv_matrix, mvp_matrix, normal_matrix);

#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct LightData {
    pub position: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct MaterialData {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// Only `x` is used.
    pub shininess: [f32; 4],
}

/// Uniform block shared by every draw of a frame (std140 compatible).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub ambient_light: [f32; 4],
    /// x: light count, y: material count.
    pub counts: [u32; 4],
    pub lights: [LightData; LIGHTS_MAX],
    pub materials: [MaterialData; MATERIALS_MAX],
}

/// One object's slice of the shared buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    /// Zero for non-indexed models.
    pub index_count: usize,
    pub instance: usize,
}

/// Geometry of the whole scene, uploaded once at pipeline build.
#[derive(Debug, Clone, Default)]
pub struct SceneUpload {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Everything a backend needs to record one frame.
#[derive(Debug, Clone)]
pub struct FrameCommands {
    pub extent: Extent,
    pub clear_color: [f32; 4],
    pub uniforms: FrameUniforms,
    pub instances: Vec<InstanceData>,
    pub draws: Vec<DrawCall>,
}

pub trait GpuBackend {
    type Swapchain;
    type Framebuffer;
    type QueryPool;
    type Semaphore;
    type Fence;

    fn surface_capabilities(&mut self) -> Result<SurfaceCapabilities, GpuError>;

    /// Render pass and descriptor pool; lives as long as the renderer.
    fn init_render_pass(&mut self) -> Result<(), GpuError>;
    fn deinit_render_pass(&mut self);

    /// Pipeline state and vertex/index buffers built from a scene snapshot.
    fn build_pipeline(&mut self, upload: &SceneUpload) -> Result<(), GpuError>;
    fn destroy_pipeline(&mut self);

    /// Creates a swapchain. A retired swapchain passed as `old` is handed over
    /// as a recreation hint and disposed of by the backend. Returns the number
    /// of images.
    fn create_swapchain(
        &mut self,
        desc: &SwapchainDesc,
        old: Option<Self::Swapchain>,
    ) -> Result<(Self::Swapchain, usize), GpuError>;
    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain);

    fn create_framebuffer(
        &mut self,
        swapchain: &Self::Swapchain,
        image: usize,
    ) -> Result<Self::Framebuffer, GpuError>;
    fn destroy_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    fn supports_pipeline_statistics(&self) -> bool;
    fn create_query_pool(&mut self) -> Result<Self::QueryPool, GpuError>;
    fn destroy_query_pool(&mut self, pool: Self::QueryPool);
    fn read_statistics(&mut self, pool: &Self::QueryPool) -> Result<PipelineStatistics, GpuError>;

    fn create_semaphore(&mut self) -> Result<Self::Semaphore, GpuError>;
    fn destroy_semaphore(&mut self, semaphore: Self::Semaphore);

    fn create_fence(&mut self) -> Result<Self::Fence, GpuError>;
    fn destroy_fence(&mut self, fence: Self::Fence);
    /// Blocks until the fence's submission has completed.
    fn wait_fence(&mut self, fence: &mut Self::Fence) -> Result<(), GpuError>;
    fn reset_fence(&mut self, fence: &mut Self::Fence) -> Result<(), GpuError>;

    fn acquire_next_image(
        &mut self,
        swapchain: &Self::Swapchain,
        timeout: Duration,
        signal: &mut Self::Semaphore,
    ) -> Result<AcquireOutcome, GpuError>;

    /// Records and submits one frame into `framebuffer`. Waits on `wait`,
    /// signals `signal` and `fence` on completion.
    #[allow(clippy::too_many_arguments)]
    fn submit(
        &mut self,
        frame: &FrameCommands,
        framebuffer: &Self::Framebuffer,
        query_pool: Option<&Self::QueryPool>,
        wait: &mut Self::Semaphore,
        signal: &mut Self::Semaphore,
        fence: &mut Self::Fence,
    ) -> Result<(), GpuError>;

    fn present(
        &mut self,
        swapchain: &Self::Swapchain,
        image: usize,
        wait: &mut Self::Semaphore,
    ) -> Result<PresentOutcome, GpuError>;

    fn wait_idle(&mut self) -> Result<(), GpuError>;
}
