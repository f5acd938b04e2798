use std::sync::{Arc, Mutex, PoisonError};

/// Mutex-guarded boolean shared between a controlling thread and a worker loop.
///
/// Used for the process-wide exit request as well as for the per-thread stop
/// requests of the renderer and the world simulation. Workers only poll it at
/// loop boundaries.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    requested: Arc<Mutex<bool>>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let mut requested = self.requested.lock().unwrap_or_else(PoisonError::into_inner);
        if !*requested {
            log::debug!("stop requested");
        }
        *requested = true;
    }

    pub fn is_requested(&self) -> bool {
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
