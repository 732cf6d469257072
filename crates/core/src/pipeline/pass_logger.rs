use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for recognition pass events.
///
/// Decouples the poller from specific output mechanisms (stdout, GUI,
/// log crate) so each caller can observe passes without changing the
/// orchestration code.
pub trait PassLogger: Send {
    /// Report that pass `index` finished with `faces` detections.
    fn pass(&mut self, index: usize, faces: usize);

    /// Record how long a named stage took for one pass.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. known faces per pass).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
///
/// Used by the desktop GUI (which shows state in its status line)
/// and by tests where logger output is irrelevant.
pub struct NullPassLogger;

impl PassLogger for NullPassLogger {
    fn pass(&mut self, _index: usize, _faces: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// CLI-oriented logger that tracks per-stage timing and metrics, and
/// reports a summary when the session stops.
///
/// Pass reports are throttled to every `throttle_passes` passes.
pub struct StdoutPassLogger {
    throttle_passes: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_passes: usize,
    total_faces: usize,
}

impl StdoutPassLogger {
    pub fn new(throttle_passes: usize) -> Self {
        Self {
            throttle_passes: throttle_passes.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_passes: 0,
            total_faces: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no pass ran.
    pub fn summary_string(&self) -> Option<String> {
        if self.total_passes == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let passes = self.total_passes;
        let mut lines = vec![format!(
            "Session summary ({passes} passes, {} faces, {:.1}s total):",
            self.total_faces,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let max_ms = durations.iter().cloned().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if passes > 0 && elapsed_ms > 0.0 {
            let rate = passes as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} passes/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutPassLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PassLogger for StdoutPassLogger {
    fn pass(&mut self, index: usize, faces: usize) {
        self.total_passes += 1;
        self.total_faces += faces;
        if index % self.throttle_passes == 0 {
            log::info!("Pass {index}: {faces} face(s)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
