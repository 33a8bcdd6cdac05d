//! Timing helpers shared by the phase modules

use std::time::Instant;

/// Records the elapsed time into a histogram when dropped
pub struct TimingGuard {
    start: Instant,
    histogram_name: &'static str,
    labels: Vec<(&'static str, String)>,
}

impl TimingGuard {
    pub fn new(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }

    /// Seconds elapsed so far
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        let labels: Vec<::metrics::Label> = self
            .labels
            .iter()
            .map(|(key, value)| ::metrics::Label::new(*key, value.clone()))
            .collect();
        ::metrics::histogram!(self.histogram_name, labels).record(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timing_guard_records_without_recorder() {
        let guard = TimingGuard::new("retail_test_duration_seconds").with_label("stage", "conformance");
        thread::sleep(Duration::from_millis(5));
        assert!(guard.elapsed_secs() >= 0.005);
        drop(guard);
    }
}
