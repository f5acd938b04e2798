//! Scriptable in-memory backend used by the frame and renderer tests.
//!
//! Every call is recorded. Misuse that would hang or corrupt a real device
//! (waiting a fence nobody signals, consuming an unsignaled semaphore) panics.

use crate::gpu::{
    AcquireOutcome, FrameCommands, GpuBackend, GpuError, PipelineStatistics, PresentMode,
    PresentOutcome, SceneUpload, SurfaceCapabilities, SwapchainDesc,
};
use crate::gpu::Extent;
use crate::shutdown::StopFlag;
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SurfaceCapabilities,
    InitRenderPass,
    DeinitRenderPass,
    BuildPipeline { vertices: usize, indices: usize },
    DestroyPipeline,
    CreateSwapchain {
        id: u32,
        old: Option<u32>,
        desc: SwapchainDesc,
    },
    DestroySwapchain(u32),
    CreateFramebuffer { id: u32, swapchain: u32, image: usize },
    DestroyFramebuffer(u32),
    CreateQueryPool(u32),
    DestroyQueryPool(u32),
    ReadStatistics(u32),
    CreateSemaphore(u32),
    DestroySemaphore(u32),
    CreateFence(u32),
    DestroyFence(u32),
    WaitFence(u32),
    ResetFence(u32),
    Acquire {
        swapchain: u32,
        outcome: AcquireOutcome,
    },
    Submit {
        framebuffer: u32,
        query_pool: Option<u32>,
        fence: u32,
        draws: usize,
    },
    Present {
        swapchain: u32,
        image: usize,
        outcome: PresentOutcome,
    },
    WaitIdle,
}

#[derive(Debug)]
pub struct FakeSwapchain {
    id: u32,
    images: usize,
}

#[derive(Debug)]
pub struct FakeFramebuffer(u32);

#[derive(Debug)]
pub struct FakeQueryPool(u32);

#[derive(Debug)]
pub struct FakeSemaphore {
    id: u32,
    signaled: bool,
}

#[derive(Debug)]
pub struct FakeFence {
    id: u32,
    pending: bool,
}

pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub capabilities: SurfaceCapabilities,
    pub statistics_supported: bool,
    pub acquire_script: VecDeque<AcquireOutcome>,
    pub present_script: VecDeque<PresentOutcome>,
    /// Requests the flag once this many presents have happened.
    pub stop_after_presents: Option<(usize, StopFlag)>,
    pub last_frame: Option<FrameCommands>,
    pub max_in_flight: usize,
    next_id: u32,
    next_image: usize,
    presents: usize,
    in_flight: Vec<u32>,
    live: BTreeSet<u32>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        RecordingBackend {
            calls: Vec::new(),
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: Some(4),
                current_extent: None,
                min_extent: Extent::new(1, 1),
                max_extent: Extent::new(4096, 4096),
                present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            },
            statistics_supported: false,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            stop_after_presents: None,
            last_frame: None,
            max_in_flight: 0,
            next_id: 1,
            next_image: 0,
            presents: 0,
            in_flight: Vec::new(),
            live: BTreeSet::new(),
        }
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        id
    }

    fn release(&mut self, id: u32) {
        assert!(self.live.remove(&id), "object {} destroyed twice", id);
    }

    pub fn signal_fence_for_test(&mut self, fence: &mut FakeFence) {
        fence.pending = true;
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(|c| predicate(c))
    }

    pub fn assert_no_leaks(&self) {
        assert!(self.live.is_empty(), "leaked objects: {:?}", self.live);
    }
}

impl GpuBackend for RecordingBackend {
    type Swapchain = FakeSwapchain;
    type Framebuffer = FakeFramebuffer;
    type QueryPool = FakeQueryPool;
    type Semaphore = FakeSemaphore;
    type Fence = FakeFence;

    fn surface_capabilities(&mut self) -> Result<SurfaceCapabilities, GpuError> {
        self.calls.push(Call::SurfaceCapabilities);
        Ok(self.capabilities.clone())
    }

    fn init_render_pass(&mut self) -> Result<(), GpuError> {
        self.calls.push(Call::InitRenderPass);
        Ok(())
    }

    fn deinit_render_pass(&mut self) {
        self.calls.push(Call::DeinitRenderPass);
    }

    fn build_pipeline(&mut self, upload: &SceneUpload) -> Result<(), GpuError> {
        self.calls.push(Call::BuildPipeline {
            vertices: upload.vertices.len(),
            indices: upload.indices.len(),
        });
        Ok(())
    }

    fn destroy_pipeline(&mut self) {
        self.calls.push(Call::DestroyPipeline);
    }

    fn create_swapchain(
        &mut self,
        desc: &SwapchainDesc,
        old: Option<FakeSwapchain>,
    ) -> Result<(FakeSwapchain, usize), GpuError> {
        let id = self.allocate();
        let old = old.map(|old| {
            self.release(old.id);
            old.id
        });
        self.calls.push(Call::CreateSwapchain {
            id,
            old,
            desc: *desc,
        });
        let images = desc.image_count as usize;
        Ok((FakeSwapchain { id, images }, images))
    }

    fn destroy_swapchain(&mut self, swapchain: FakeSwapchain) {
        self.release(swapchain.id);
        self.calls.push(Call::DestroySwapchain(swapchain.id));
    }

    fn create_framebuffer(
        &mut self,
        swapchain: &FakeSwapchain,
        image: usize,
    ) -> Result<FakeFramebuffer, GpuError> {
        assert!(image < swapchain.images);
        let id = self.allocate();
        self.calls.push(Call::CreateFramebuffer {
            id,
            swapchain: swapchain.id,
            image,
        });
        Ok(FakeFramebuffer(id))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FakeFramebuffer) {
        self.release(framebuffer.0);
        self.calls.push(Call::DestroyFramebuffer(framebuffer.0));
    }

    fn supports_pipeline_statistics(&self) -> bool {
        self.statistics_supported
    }

    fn create_query_pool(&mut self) -> Result<FakeQueryPool, GpuError> {
        if !self.statistics_supported {
            return Err(GpuError::Unsupported("pipeline statistics queries"));
        }
        let id = self.allocate();
        self.calls.push(Call::CreateQueryPool(id));
        Ok(FakeQueryPool(id))
    }

    fn destroy_query_pool(&mut self, pool: FakeQueryPool) {
        self.release(pool.0);
        self.calls.push(Call::DestroyQueryPool(pool.0));
    }

    fn read_statistics(&mut self, pool: &FakeQueryPool) -> Result<PipelineStatistics, GpuError> {
        self.calls.push(Call::ReadStatistics(pool.0));
        Ok(PipelineStatistics {
            input_assembly_vertices: 36,
            input_assembly_primitives: 12,
            vertex_shader_invocations: 36,
            clipping_invocations: 12,
            clipping_primitives: 12,
            fragment_shader_invocations: 1000,
        })
    }

    fn create_semaphore(&mut self) -> Result<FakeSemaphore, GpuError> {
        let id = self.allocate();
        self.calls.push(Call::CreateSemaphore(id));
        Ok(FakeSemaphore {
            id,
            signaled: false,
        })
    }

    fn destroy_semaphore(&mut self, semaphore: FakeSemaphore) {
        self.release(semaphore.id);
        self.calls.push(Call::DestroySemaphore(semaphore.id));
    }

    fn create_fence(&mut self) -> Result<FakeFence, GpuError> {
        let id = self.allocate();
        self.calls.push(Call::CreateFence(id));
        Ok(FakeFence { id, pending: false })
    }

    fn destroy_fence(&mut self, fence: FakeFence) {
        self.release(fence.id);
        self.calls.push(Call::DestroyFence(fence.id));
    }

    fn wait_fence(&mut self, fence: &mut FakeFence) -> Result<(), GpuError> {
        assert!(
            fence.pending,
            "waiting on fence {} that was never submitted",
            fence.id
        );
        self.in_flight.retain(|id| *id != fence.id);
        self.calls.push(Call::WaitFence(fence.id));
        Ok(())
    }

    fn reset_fence(&mut self, fence: &mut FakeFence) -> Result<(), GpuError> {
        fence.pending = false;
        self.calls.push(Call::ResetFence(fence.id));
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        swapchain: &FakeSwapchain,
        _timeout: Duration,
        signal: &mut FakeSemaphore,
    ) -> Result<AcquireOutcome, GpuError> {
        let outcome = match self.acquire_script.pop_front() {
            Some(outcome) => outcome,
            None => {
                let image = self.next_image % swapchain.images;
                self.next_image += 1;
                AcquireOutcome::Acquired {
                    image,
                    suboptimal: false,
                }
            }
        };
        if let AcquireOutcome::Acquired { .. } = outcome {
            assert!(!signal.signaled, "semaphore {} signaled twice", signal.id);
            signal.signaled = true;
        }
        self.calls.push(Call::Acquire {
            swapchain: swapchain.id,
            outcome,
        });
        Ok(outcome)
    }

    fn submit(
        &mut self,
        frame: &FrameCommands,
        framebuffer: &FakeFramebuffer,
        query_pool: Option<&FakeQueryPool>,
        wait: &mut FakeSemaphore,
        signal: &mut FakeSemaphore,
        fence: &mut FakeFence,
    ) -> Result<(), GpuError> {
        assert!(wait.signaled, "submit waits on unsignaled semaphore {}", wait.id);
        assert!(!signal.signaled, "semaphore {} signaled twice", signal.id);
        assert!(!fence.pending, "fence {} reused before reset", fence.id);
        wait.signaled = false;
        signal.signaled = true;
        fence.pending = true;
        self.in_flight.push(fence.id);
        self.max_in_flight = self.max_in_flight.max(self.in_flight.len());
        self.calls.push(Call::Submit {
            framebuffer: framebuffer.0,
            query_pool: query_pool.map(|p| p.0),
            fence: fence.id,
            draws: frame.draws.len(),
        });
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn present(
        &mut self,
        swapchain: &FakeSwapchain,
        image: usize,
        wait: &mut FakeSemaphore,
    ) -> Result<PresentOutcome, GpuError> {
        assert!(wait.signaled, "present waits on unsignaled semaphore {}", wait.id);
        wait.signaled = false;
        let outcome = self
            .present_script
            .pop_front()
            .unwrap_or(PresentOutcome::Presented);
        self.calls.push(Call::Present {
            swapchain: swapchain.id,
            image,
            outcome,
        });
        self.presents += 1;
        if let Some((limit, flag)) = &self.stop_after_presents {
            if self.presents >= *limit {
                flag.request();
            }
        }
        Ok(outcome)
    }

    fn wait_idle(&mut self) -> Result<(), GpuError> {
        self.in_flight.clear();
        self.calls.push(Call::WaitIdle);
        Ok(())
    }
}
