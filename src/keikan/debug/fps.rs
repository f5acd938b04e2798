use std::time::{Duration, Instant};

const REPORT_AFTER: Duration = Duration::from_secs(10);
const EARLY_REPORT_AFTER: Duration = Duration::from_secs(1);
const EARLY_REPORT_FRAMES: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
    pub frames: u32,
    pub elapsed: Duration,
}

impl FpsReport {
    pub fn fps(&self) -> f64 {
        f64::from(self.frames) / self.elapsed.as_secs_f64()
    }
}

/// Counts presented frames and reports the rate every ten seconds, or after
/// one second once more than fifty frames were shown.
pub struct Counter {
    last_time: Instant,
    frames: u32,
}

impl Counter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            last_time: start,
            frames: 0,
        }
    }

    pub fn tick(&mut self) -> Option<FpsReport> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<FpsReport> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.last_time);
        let due = elapsed > REPORT_AFTER
            || (self.frames > EARLY_REPORT_FRAMES && elapsed > EARLY_REPORT_AFTER);
        if due {
            let report = FpsReport {
                frames: self.frames,
                elapsed,
            };
            self.last_time = now;
            self.frames = 0;
            Some(report)
        } else {
            None
        }
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}
