use crate::gpu::{
    AcquireOutcome, Extent, FrameCommands, GpuBackend, GpuError, PipelineStatistics, PresentMode,
    PresentOutcome, SurfaceCapabilities, SwapchainDesc,
};
use crate::platform::WindowExtent;
use std::time::Duration;

/// Picks the surface's own extent, or the window size clamped per axis when the
/// surface leaves it to the application.
pub fn choose_extent(capabilities: &SurfaceCapabilities, requested: Extent) -> Extent {
    if let Some(current_extent) = capabilities.current_extent {
        current_extent
    } else {
        let min = capabilities.min_extent;
        let max = capabilities.max_extent;
        Extent {
            width: min.width.max(max.width.min(requested.width)),
            height: min.height.max(max.height.min(requested.height)),
        }
    }
}

/// Requested mode if the surface supports it, then mailbox, then fifo.
pub fn choose_present_mode(
    capabilities: &SurfaceCapabilities,
    requested: Option<PresentMode>,
) -> PresentMode {
    if let Some(mode) = requested {
        if capabilities.present_modes.contains(&mode) {
            return mode;
        }
        log::warn!("present mode {} is not supported by the surface", mode);
    }
    if capabilities.present_modes.contains(&PresentMode::Mailbox) {
        PresentMode::Mailbox
    } else {
        PresentMode::Fifo
    }
}

pub fn choose_image_count(capabilities: &SurfaceCapabilities) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    match capabilities.max_image_count {
        Some(max) if max > 0 && image_count > max => max,
        _ => image_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainState {
    Uninitialized,
    Created,
    FramebuffersReady,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapchainSettings {
    pub present_mode: Option<PresentMode>,
    pub statistics: bool,
}

struct FramebufferSlot<B: GpuBackend> {
    framebuffer: B::Framebuffer,
    query_pool: Option<B::QueryPool>,
}

/// Owns the presentable image chain, its framebuffers and the two frame
/// semaphores.
///
/// Destruction of any tier must be preceded by a device idle wait; the
/// renderer loop does that before calling the `destroy_*` methods.
pub struct SwapchainManager<B: GpuBackend> {
    settings: SwapchainSettings,
    window: WindowExtent,
    swapchain: Option<B::Swapchain>,
    extent: Extent,
    image_count: usize,
    framebuffers: Vec<FramebufferSlot<B>>,
    image_acquired: Option<B::Semaphore>,
    rendering_complete: Option<B::Semaphore>,
    state: SwapchainState,
}

impl<B: GpuBackend> SwapchainManager<B> {
    pub fn new(settings: SwapchainSettings, window: WindowExtent) -> Self {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        SwapchainManager {
            settings,
            window,
            swapchain: None,
            extent: Extent::default(),
            image_count: 0,
            framebuffers: Vec::new(),
            image_acquired: None,
            rendering_complete: None,
            state: SwapchainState::Uninitialized,
        }
    }

    pub fn state(&self) -> SwapchainState {
        self.state
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    /// Creates (or recreates) the swapchain and its semaphores. A swapchain
    /// left over from a previous run is passed to the backend as a hint.
    pub fn create(&mut self, backend: &mut B) -> Result<(), GpuError> {
        let capabilities = backend.surface_capabilities()?;
        let desc = SwapchainDesc {
            image_count: choose_image_count(&capabilities),
            extent: choose_extent(&capabilities, self.window.get()),
            present_mode: choose_present_mode(&capabilities, self.settings.present_mode),
        };
        let old = self.swapchain.take();
        let recreated = old.is_some();
        let (swapchain, image_count) = backend.create_swapchain(&desc, old)?;
        self.swapchain = Some(swapchain);
        self.extent = desc.extent;
        self.image_count = image_count;

        self.destroy_semaphores(backend);
        self.image_acquired = Some(backend.create_semaphore()?);
        self.rendering_complete = Some(backend.create_semaphore()?);
        self.state = SwapchainState::Created;

        log::debug!(
            "swapchain {}: {} images, {}x{}, {}",
            if recreated { "recreated" } else { "created" },
            image_count,
            desc.extent.width,
            desc.extent.height,
            desc.present_mode
        );
        Ok(())
    }

    pub fn create_framebuffers(&mut self, backend: &mut B) -> Result<(), GpuError> {
        let swapchain = match &self.swapchain {
            Some(swapchain) => swapchain,
            None => {
                return Err(GpuError::Backend {
                    context: "create framebuffers",
                    message: "no swapchain".into(),
                })
            }
        };
        for image in 0..self.image_count {
            let framebuffer = backend.create_framebuffer(swapchain, image)?;
            let query_pool = if self.settings.statistics {
                match backend.create_query_pool() {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        backend.destroy_framebuffer(framebuffer);
                        return Err(e);
                    }
                }
            } else {
                None
            };
            self.framebuffers.push(FramebufferSlot {
                framebuffer,
                query_pool,
            });
        }
        self.state = SwapchainState::FramebuffersReady;
        Ok(())
    }

    pub fn destroy_framebuffers(&mut self, backend: &mut B) {
        for slot in self.framebuffers.drain(..) {
            if let Some(pool) = slot.query_pool {
                backend.destroy_query_pool(pool);
            }
            backend.destroy_framebuffer(slot.framebuffer);
        }
        if self.state == SwapchainState::FramebuffersReady {
            self.state = SwapchainState::Created;
        }
    }

    pub fn destroy_swapchain(&mut self, backend: &mut B) {
        if let Some(swapchain) = self.swapchain.take() {
            backend.destroy_swapchain(swapchain);
        }
        self.image_count = 0;
        self.state = SwapchainState::Uninitialized;
    }

    pub fn destroy_semaphores(&mut self, backend: &mut B) {
        if let Some(semaphore) = self.image_acquired.take() {
            backend.destroy_semaphore(semaphore);
        }
        if let Some(semaphore) = self.rendering_complete.take() {
            backend.destroy_semaphore(semaphore);
        }
    }

    /// Full teardown: framebuffers, swapchain, then semaphores.
    pub fn destroy(&mut self, backend: &mut B) {
        self.destroy_framebuffers(backend);
        self.destroy_swapchain(backend);
        self.destroy_semaphores(backend);
    }

    pub fn acquire(&mut self, backend: &mut B, timeout: Duration) -> Result<AcquireOutcome, GpuError> {
        match (&self.swapchain, &mut self.image_acquired) {
            (Some(swapchain), Some(image_acquired)) => {
                backend.acquire_next_image(swapchain, timeout, image_acquired)
            }
            _ => Ok(AcquireOutcome::OutOfDate),
        }
    }

    /// Submits `frame` into the framebuffer of `image`, chained between the
    /// acquire and present semaphores.
    pub fn submit(
        &mut self,
        backend: &mut B,
        image: usize,
        frame: &FrameCommands,
        fence: &mut B::Fence,
    ) -> Result<(), GpuError> {
        let slot = self.framebuffers.get(image);
        match (slot, &mut self.image_acquired, &mut self.rendering_complete) {
            (Some(slot), Some(wait), Some(signal)) => backend.submit(
                frame,
                &slot.framebuffer,
                slot.query_pool.as_ref(),
                wait,
                signal,
                fence,
            ),
            _ => Err(GpuError::Backend {
                context: "submit",
                message: format!("no framebuffer for image {}", image),
            }),
        }
    }

    pub fn present(&mut self, backend: &mut B, image: usize) -> Result<PresentOutcome, GpuError> {
        match (&self.swapchain, &mut self.rendering_complete) {
            (Some(swapchain), Some(rendering_complete)) => {
                backend.present(swapchain, image, rendering_complete)
            }
            _ => Ok(PresentOutcome::OutOfDate),
        }
    }

    /// Statistics of the last frame rendered into `image`, if enabled.
    pub fn read_statistics(
        &self,
        backend: &mut B,
        image: usize,
    ) -> Result<Option<PipelineStatistics>, GpuError> {
        match self.framebuffers.get(image).and_then(|s| s.query_pool.as_ref()) {
            Some(pool) => backend.read_statistics(pool).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingBackend};

    fn capabilities() -> SurfaceCapabilities {
        SurfaceCapabilities {
            min_image_count: 2,
            max_image_count: Some(3),
            current_extent: None,
            min_extent: Extent::new(64, 64),
            max_extent: Extent::new(1920, 1080),
            present_modes: vec![PresentMode::Fifo, PresentMode::Immediate],
        }
    }

    #[test]
    fn undefined_extent_clamps_each_axis() {
        let caps = capabilities();
        assert_eq!(choose_extent(&caps, Extent::new(500, 500)), Extent::new(500, 500));
        assert_eq!(choose_extent(&caps, Extent::new(4000, 10)), Extent::new(1920, 64));
        assert_eq!(choose_extent(&caps, Extent::new(0, 2000)), Extent::new(64, 1080));
    }

    #[test]
    fn surface_extent_wins_when_defined() {
        let caps = SurfaceCapabilities {
            current_extent: Some(Extent::new(800, 600)),
            ..capabilities()
        };
        assert_eq!(choose_extent(&caps, Extent::new(500, 500)), Extent::new(800, 600));
    }

    #[test]
    fn present_mode_preference() {
        let mut caps = capabilities();
        assert_eq!(choose_present_mode(&caps, None), PresentMode::Fifo);
        assert_eq!(
            choose_present_mode(&caps, Some(PresentMode::Immediate)),
            PresentMode::Immediate
        );
        assert_eq!(
            choose_present_mode(&caps, Some(PresentMode::FifoRelaxed)),
            PresentMode::Fifo
        );
        caps.present_modes.push(PresentMode::Mailbox);
        assert_eq!(choose_present_mode(&caps, None), PresentMode::Mailbox);
    }

    #[test]
    fn image_count_respects_maximum() {
        let mut caps = capabilities();
        assert_eq!(choose_image_count(&caps), 3);
        caps.max_image_count = Some(2);
        assert_eq!(choose_image_count(&caps), 2);
        caps.max_image_count = None;
        caps.min_image_count = 4;
        assert_eq!(choose_image_count(&caps), 5);
    }

    #[test]
    fn lifecycle_walks_through_states() {
        let mut backend = RecordingBackend::new();
        let window = WindowExtent::new(Extent::new(500, 400));
        let settings = SwapchainSettings {
            present_mode: None,
            statistics: false,
        };
        let mut manager = SwapchainManager::new(settings, window);
        assert_eq!(manager.state(), SwapchainState::Uninitialized);

        manager.create(&mut backend).unwrap();
        assert_eq!(manager.state(), SwapchainState::Created);
        assert_eq!(manager.extent(), Extent::new(500, 400));
        manager.create_framebuffers(&mut backend).unwrap();
        assert_eq!(manager.state(), SwapchainState::FramebuffersReady);
        let framebuffers = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CreateFramebuffer { .. }))
            .count();
        assert_eq!(framebuffers, manager.image_count());

        manager.destroy_framebuffers(&mut backend);
        manager.create(&mut backend).unwrap();
        assert!(backend
            .calls
            .iter()
            .any(|c| matches!(c, Call::CreateSwapchain { old: Some(_), .. })));

        manager.destroy(&mut backend);
        assert_eq!(manager.state(), SwapchainState::Uninitialized);
        assert!(!backend
            .calls
            .iter()
            .any(|c| matches!(c, Call::CreateQueryPool(_))));
        backend.assert_no_leaks();
    }

    #[test]
    fn statistics_create_one_pool_per_framebuffer() {
        let mut backend = RecordingBackend::new();
        backend.statistics_supported = true;
        let settings = SwapchainSettings {
            present_mode: None,
            statistics: true,
        };
        let mut manager = SwapchainManager::new(settings, WindowExtent::new(Extent::new(100, 100)));
        manager.create(&mut backend).unwrap();
        manager.create_framebuffers(&mut backend).unwrap();
        let pools = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CreateQueryPool(_)))
            .count();
        assert_eq!(pools, manager.image_count());
        manager.destroy(&mut backend);
        backend.assert_no_leaks();
    }
}
