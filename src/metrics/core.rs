//! Timing helpers shared by the phase metrics
//!
//! Stages hold a [`TimingGuard`] for their whole body; the elapsed time is
//! recorded into the phase's duration histogram when the guard drops, which
//! also covers early returns through `?`.

use std::time::Instant;

/// Records the elapsed time into a histogram when dropped
pub struct TimingGuard {
    start: Instant,
    histogram_name: &'static str,
}

impl TimingGuard {
    pub fn new(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name,
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        ::metrics::histogram!(self.histogram_name).record(duration);
    }
}

pub fn time_operation(histogram_name: &'static str) -> TimingGuard {
    TimingGuard::new(histogram_name)
}
