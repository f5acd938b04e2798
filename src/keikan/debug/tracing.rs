use std::time::Duration;
use std::time::Instant;

pub fn timed<T>(tag: &str, body: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = body();
    log::trace!("run of {} {:?}", tag, start.elapsed());
    result
}

/// Running average of a repeated section, logged at trace level every
/// `report_every`.
pub struct Tracer {
    last_report: Instant,
    report_every: Duration,
    average: Option<Duration>,
    tag: &'static str,
}

impl Tracer {
    pub fn new(tag: &'static str, report_every: Duration) -> Self {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        Self {
            last_report: Instant::now(),
            report_every,
            average: None,
            tag,
        }
    }

    pub fn average(&self) -> Option<Duration> {
        self.average
    }

    pub fn run<T>(&mut self, body: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = body();
        let took = start.elapsed();
        self.average = Some(match self.average {
            Some(average) => (average + took) / 2,
            None => took,
        });
        if self.last_report.elapsed() >= self.report_every {
            self.last_report = Instant::now();
            log::trace!("run of {} {:?}", self.tag, self.average.unwrap_or(took));
        }
        result
    }
}
