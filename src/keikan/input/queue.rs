use crate::input::{InputEvent, InputEventKind};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Bounded FIFO between the platform event source and the world simulation.
///
/// Producers never block: an event arriving while the queue is full is dropped
/// and logged. The single consumer waits with an absolute deadline.
#[derive(Debug)]
pub struct InputQueue {
    events: Mutex<VecDeque<InputEvent>>,
    available: Condvar,
    capacity: usize,
}

impl InputQueue {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new(capacity: usize) -> Self {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        let capacity = capacity.max(1);
        InputQueue {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<InputEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timestamps the event under the queue lock, so queue order is timestamp
    /// order. Returns `false` if the event was dropped.
    pub fn push(&self, kind: InputEventKind) -> bool {
        let mut events = self.events();
        let event = InputEvent {
            timestamp: Instant::now(),
            kind,
        };
        self.enqueue(&mut events, event)
    }

    /// Enqueues an already timestamped event.
    pub fn push_event(&self, event: InputEvent) -> bool {
        let mut events = self.events();
        self.enqueue(&mut events, event)
    }

    fn enqueue(&self, events: &mut VecDeque<InputEvent>, event: InputEvent) -> bool {
        if events.len() >= self.capacity {
            log::warn!("dropping {} event", event.kind);
            return false;
        }
        events.push_back(event);
        self.available.notify_one();
        true
    }

    /// Pops the oldest event stamped at or before `deadline`, waiting for one to
    /// arrive until the deadline passes. Events stamped later stay queued.
    pub fn pop_until(&self, deadline: Instant) -> Option<InputEvent> {
        let mut events = self.events();
        loop {
            if let Some(front) = events.front() {
                if front.timestamp <= deadline {
                    return events.pop_front();
                }
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .available
                .wait_timeout(events, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            events = guard;
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn key(c: char) -> InputEventKind {
        InputEventKind::KeyPress(Key::Char(c))
    }

    #[test]
    fn full_queue_drops_newest_and_keeps_order() {
        let queue = InputQueue::new(4);
        for c in "abcd".chars() {
            assert!(queue.push(key(c)));
        }
        assert!(!queue.push(key('x')));
        assert!(!queue.push(key('y')));
        assert_eq!(queue.len(), 4);

        let deadline = Instant::now();
        let drained: Vec<_> = std::iter::from_fn(|| queue.pop_until(deadline))
            .map(|e| e.kind)
            .collect();
        assert_eq!(drained, "abcd".chars().map(key).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn space_frees_up_after_pop() {
        let queue = InputQueue::new(2);
        queue.push(key('a'));
        queue.push(key('b'));
        assert!(!queue.push(key('c')));
        queue.pop_until(Instant::now());
        assert!(queue.push(key('d')));
    }

    #[test]
    fn events_after_deadline_are_deferred() {
        let queue = InputQueue::default();
        let base = Instant::now();
        let boundary = base + Duration::from_millis(50);
        queue.push_event(InputEvent {
            timestamp: base,
            kind: key('a'),
        });
        queue.push_event(InputEvent {
            timestamp: boundary + Duration::from_millis(1),
            kind: key('b'),
        });
        assert_eq!(queue.pop_until(boundary).map(|e| e.kind), Some(key('a')));
        assert_eq!(queue.pop_until(boundary), None);
        assert_eq!(queue.len(), 1);
        let later = boundary + Duration::from_millis(50);
        assert_eq!(queue.pop_until(later).map(|e| e.kind), Some(key('b')));
    }

    #[test]
    fn empty_queue_times_out_at_deadline() {
        let queue = InputQueue::default();
        let start = Instant::now();
        let deadline = start + Duration::from_millis(30);
        assert_eq!(queue.pop_until(deadline), None);
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn waiting_consumer_wakes_on_push() {
        let queue = Arc::new(InputQueue::default());
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(key('z'));
            })
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        let event = queue.pop_until(deadline);
        assert_eq!(event.map(|e| e.kind), Some(key('z')));
        assert!(Instant::now() < deadline);
        producer.join().unwrap();
    }
}
