//! Latency and throughput bookkeeping for a processing run.
//!
//! Observational only: nothing in here feeds back into pipeline decisions.

use std::time::Duration;

/// A value together with the time it took to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    pub fn new(value: T, elapsed: Duration) -> Self {
        Self { value, elapsed }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Running count and total for one stage; constant size however long the run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StageTotals {
    count: usize,
    total: Duration,
}

impl StageTotals {
    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
    }

    fn mean_millis(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total.as_secs_f64() * 1000.0 / self.count as f64)
    }
}

/// Per-run latency collector, reset at the start of a run and flushed at the end.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    plate: StageTotals,
    character: StageTotals,
    frame: StageTotals,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_plate(&mut self, elapsed: Duration) {
        self.plate.record(elapsed);
    }

    pub fn record_char(&mut self, elapsed: Duration) {
        self.character.record(elapsed);
    }

    pub fn record_frame(&mut self, elapsed: Duration) {
        self.frame.record(elapsed);
    }

    pub fn frames(&self) -> usize {
        self.frame.count
    }

    pub fn summary(&self) -> MetricsSummary {
        let mean_fps = if self.frame.total.is_zero() {
            None
        } else {
            Some(self.frame.count as f64 / self.frame.total.as_secs_f64())
        };
        MetricsSummary {
            frames: self.frame.count,
            plate_detections: self.plate.count,
            char_recognitions: self.character.count,
            mean_plate_ms: self.plate.mean_millis(),
            mean_char_ms: self.character.mean_millis(),
            mean_fps,
        }
    }

    /// Summarise and clear.
    pub fn flush(&mut self) -> MetricsSummary {
        let summary = self.summary();
        self.reset();
        summary
    }
}

/// Averages over one run. `None` when nothing was measured.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub frames: usize,
    pub plate_detections: usize,
    pub char_recognitions: usize,
    pub mean_plate_ms: Option<f64>,
    pub mean_char_ms: Option<f64>,
    pub mean_fps: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_averages() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_plate(Duration::from_millis(10));
        metrics.record_plate(Duration::from_millis(30));
        metrics.record_frame(Duration::from_millis(50));
        metrics.record_frame(Duration::from_millis(50));

        let summary = metrics.flush();
        assert_eq!(summary.frames, 2);
        assert!((summary.mean_plate_ms.unwrap() - 20.0).abs() < 1e-9);
        assert!(summary.mean_char_ms.is_none());
        assert!((summary.mean_fps.unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(metrics.frames(), 0);
    }

    #[test]
    fn test_long_run_keeps_totals_only() {
        let mut metrics = PipelineMetrics::new();
        for i in 0..100_000u64 {
            metrics.record_frame(Duration::from_millis(40));
            metrics.record_plate(Duration::from_millis(10 + i % 3));
        }
        metrics.record_char(Duration::from_millis(5));

        let summary = metrics.summary();
        assert_eq!(summary.frames, 100_000);
        assert_eq!(summary.plate_detections, 100_000);
        assert_eq!(summary.char_recognitions, 1);
        assert!((summary.mean_fps.unwrap() - 25.0).abs() < 1e-6);
        assert!((summary.mean_plate_ms.unwrap() - 11.0).abs() < 1e-3);
        assert!((summary.mean_char_ms.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(std::mem::size_of::<PipelineMetrics>(), 3 * std::mem::size_of::<StageTotals>());
    }

    #[test]
    fn test_empty_summary() {
        let summary = PipelineMetrics::new().summary();
        assert_eq!(summary.frames, 0);
        assert!(summary.mean_plate_ms.is_none());
        assert!(summary.mean_fps.is_none());
    }
}
