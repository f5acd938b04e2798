use crate::gpu::{GpuBackend, GpuError};

struct FenceSlot<F> {
    fence: F,
    submitted: bool,
}

/// Round-robin ring of frame fences bounding how far the CPU runs ahead of the
/// GPU. A slot is only waited on once work signalling it has been submitted.
pub struct FrameFences<F> {
    slots: Vec<FenceSlot<F>>,
    current: usize,
}

impl<F> FrameFences<F> {
    pub fn create<B>(backend: &mut B, depth: usize) -> Result<Self, GpuError>
    where
        B: GpuBackend<Fence = F>,
    {
        let depth = depth.max(1);
        let mut slots = Vec::with_capacity(depth);
        for _ in 0..depth {
            match backend.create_fence() {
                Ok(fence) => slots.push(FenceSlot {
                    fence,
                    submitted: false,
                }),
                Err(e) => {
                    for slot in slots {
                        backend.destroy_fence(slot.fence);
                    }
                    return Err(e);
                }
            }
        }
        Ok(FrameFences { slots, current: 0 })
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Blocks on the current slot if it carries an earlier submission, then
    /// resets it for reuse.
    pub fn wait_current<B>(&mut self, backend: &mut B) -> Result<(), GpuError>
    where
        B: GpuBackend<Fence = F>,
    {
        let slot = &mut self.slots[self.current];
        if slot.submitted {
            backend.wait_fence(&mut slot.fence)?;
            backend.reset_fence(&mut slot.fence)?;
            slot.submitted = false;
        }
        Ok(())
    }

    pub fn current_mut(&mut self) -> &mut F {
        &mut self.slots[self.current].fence
    }

    pub fn mark_submitted(&mut self) {
        self.slots[self.current].submitted = true;
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    pub fn destroy<B>(self, backend: &mut B)
    where
        B: GpuBackend<Fence = F>,
    {
        for slot in self.slots {
            backend.destroy_fence(slot.fence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Call, RecordingBackend};

    #[test]
    fn fresh_slots_are_not_waited() {
        let mut backend = RecordingBackend::new();
        let mut fences = FrameFences::create(&mut backend, 2).unwrap();
        fences.wait_current(&mut backend).unwrap();
        fences.advance();
        fences.wait_current(&mut backend).unwrap();
        assert!(!backend.calls.iter().any(|c| matches!(c, Call::WaitFence(_))));
        fences.destroy(&mut backend);
        backend.assert_no_leaks();
    }

    #[test]
    fn submitted_slot_is_waited_and_reset_once() {
        let mut backend = RecordingBackend::new();
        let mut fences = FrameFences::create(&mut backend, 2).unwrap();
        backend.signal_fence_for_test(fences.current_mut());
        fences.mark_submitted();
        fences.advance();
        fences.advance();

        fences.wait_current(&mut backend).unwrap();
        fences.wait_current(&mut backend).unwrap();
        let waits = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::WaitFence(_)))
            .count();
        let resets = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::ResetFence(_)))
            .count();
        assert_eq!((waits, resets), (1, 1));
        fences.destroy(&mut backend);
    }
}
