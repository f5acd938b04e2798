pub mod window;

use crate::gpu::Extent;
use crate::input::InputCallbacks;
use crate::shutdown::StopFlag;
use std::sync::{Arc, Mutex, PoisonError};

/// Window size as last reported by the windowing system. Consulted when the
/// surface leaves the swapchain extent to the application.
#[derive(Debug, Clone, Default)]
pub struct WindowExtent {
    extent: Arc<Mutex<Extent>>,
}

impl WindowExtent {
    pub fn new(extent: Extent) -> Self {
        WindowExtent {
            extent: Arc::new(Mutex::new(extent)),
        }
    }

    pub fn get(&self) -> Extent {
        *self.extent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, extent: Extent) {
        *self.extent.lock().unwrap_or_else(PoisonError::into_inner) = extent;
    }
}

/// Presentable window plus its native event source.
pub trait PlatformSurface {
    fn window_extent(&self) -> WindowExtent;

    /// Pumps native events into `callbacks` until `exit` is requested or the
    /// window is closed (which requests `exit` as well).
    fn event_loop(&mut self, callbacks: &dyn InputCallbacks, exit: &StopFlag);
}
