//! Render thread: owns every GPU object and drives the
//! acquire/render/present cycle until asked to stop.

use crate::debug::fps::Counter;
use crate::debug::tracing::Tracer;
use crate::frame::fences::FrameFences;
use crate::frame::swapchain::{SwapchainManager, SwapchainSettings};
use crate::frame::FramePipeline;
use crate::gpu::{AcquireOutcome, GpuBackend, GpuError, PresentMode, PresentOutcome};
use crate::platform::WindowExtent;
use crate::scene::Scene;
use crate::shutdown::StopFlag;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    /// Frames the CPU may run ahead of the GPU.
    pub frame_lag: usize,
    pub acquire_timeout: Duration,
    pub statistics: bool,
    /// Zero disables the cap.
    pub fps_cap: u32,
    pub present_mode: Option<PresentMode>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            frame_lag: 2,
            acquire_timeout: Duration::from_millis(50),
            statistics: false,
            fps_cap: 0,
            present_mode: None,
        }
    }
}

impl RendererConfig {
    fn frame_interval(&self) -> Option<Duration> {
        if self.fps_cap == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / f64::from(self.fps_cap)))
        }
    }
}

/// Handle of the running render thread.
pub struct Renderer {
    stop: StopFlag,
    thread: Option<JoinHandle<()>>,
}

impl Renderer {
    /// Spawns the render thread. The backend is built by `factory` on that
    /// thread so GPU objects never cross threads. Whenever the thread ends,
    /// for any reason, it requests `exit`.
    pub fn start<B, F>(
        config: RendererConfig,
        scene: Arc<Scene>,
        window: WindowExtent,
        exit: StopFlag,
        factory: F,
    ) -> io::Result<Self>
    where
        B: GpuBackend,
        F: FnOnce() -> Result<B, GpuError> + Send + 'static,
    {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        let stop = StopFlag::new();
        let thread = {
            let stop = stop.clone();
            thread::Builder::new()
                .name("renderer".into())
                .spawn(move || {
                    let result = factory().and_then(|mut backend| {
                        run(&mut backend, &config, &scene, window, &stop, &exit)
                    });
                    if let Err(e) = result {
                        log::error!("renderer failed: {}", e);
                    }
                    log::debug!("renderer thread finished");
                    exit.request();
                })?
        };
        Ok(Renderer {
            stop,
            thread: Some(thread),
        })
    }

    /// Stops at the next frame boundary and joins the thread.
    pub fn stop(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.stop.request();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("renderer thread panicked");
            }
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.join();
    }
}

fn stopping(stop: &StopFlag, exit: &StopFlag) -> bool {
    stop.is_requested() || exit.is_requested()
}

/// Whole life of the renderer on the calling thread. Every GPU object created
/// here is destroyed before returning, after a device idle wait, whether the
/// loop ended normally or with an error.
pub fn run<B: GpuBackend>(
    backend: &mut B,
    config: &RendererConfig,
    scene: &Scene,
    window: WindowExtent,
    stop: &StopFlag,
    exit: &StopFlag,
) -> Result<(), GpuError> {
    if config.statistics && !backend.supports_pipeline_statistics() {
        return Err(GpuError::Unsupported("pipeline statistics queries"));
    }
    let settings = SwapchainSettings {
        present_mode: config.present_mode,
        statistics: config.statistics,
    };
    let mut swapchain = SwapchainManager::new(settings, window);
    let mut fences = FrameFences::create(backend, config.frame_lag)?;

    let result = backend.init_render_pass().and_then(|()| {
        let result = FramePipeline::build(backend, scene).and_then(|mut pipeline| {
            let result = render_loop(
                backend,
                config,
                scene,
                &mut swapchain,
                &mut fences,
                &mut pipeline,
                stop,
                exit,
            );
            let idle = backend.wait_idle();
            swapchain.destroy_framebuffers(backend);
            swapchain.destroy_swapchain(backend);
            backend.destroy_pipeline();
            result.and(idle)
        });
        backend.deinit_render_pass();
        result
    });

    swapchain.destroy_semaphores(backend);
    fences.destroy(backend);
    result
}

#[allow(clippy::too_many_arguments)]
fn render_loop<B: GpuBackend>(
    backend: &mut B,
    config: &RendererConfig,
    scene: &Scene,
    swapchain: &mut SwapchainManager<B>,
    fences: &mut FrameFences<B::Fence>,
    pipeline: &mut FramePipeline,
    stop: &StopFlag,
    exit: &StopFlag,
) -> Result<(), GpuError> {
    let frame_interval = config.frame_interval();
    let mut fps = Counter::new();
    let mut tracer = Tracer::new("frame submit", Duration::from_secs(5));
    let mut last_frame = Instant::now();

    while !stopping(stop, exit) {
        swapchain.create(backend)?;
        swapchain.create_framebuffers(backend)?;

        while !stopping(stop, exit) {
            fences.wait_current(backend)?;

            let (image, suboptimal) = match swapchain.acquire(backend, config.acquire_timeout)? {
                AcquireOutcome::Acquired { image, suboptimal } => (image, suboptimal),
                AcquireOutcome::OutOfDate => {
                    log::debug!("swapchain out of date on acquire");
                    break;
                }
                AcquireOutcome::Timeout => {
                    log::warn!("timed out acquiring a swapchain image");
                    continue;
                }
            };

            tracer.run(|| pipeline.render(backend, swapchain, image, scene, fences.current_mut()))?;
            fences.mark_submitted();
            let presented = swapchain.present(backend, image)?;
            fences.advance();

            if config.statistics {
                if let Some(statistics) = swapchain.read_statistics(backend, image)? {
                    log::info!("{}", statistics);
                }
            }

            if let Some(report) = fps.tick() {
                log::info!(
                    "{:5} frames in {:5.2} s - {:5.1} FPS",
                    report.frames,
                    report.elapsed.as_secs_f64(),
                    report.fps()
                );
            }

            if let Some(interval) = frame_interval {
                let elapsed = last_frame.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
            last_frame = Instant::now();

            if presented == PresentOutcome::OutOfDate || suboptimal {
                log::debug!("swapchain stale after present, rebuilding");
                break;
            }
        }

        backend.wait_idle()?;
        swapchain.destroy_framebuffers(backend);
    }
    Ok(())
}
