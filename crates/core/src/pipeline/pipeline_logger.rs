use std::collections::HashMap;
use std::time::Instant;

/// Observer for batch-run events.
///
/// Keeps the orchestrator independent of where progress ends up, so the CLI
/// can report through `log` while tests stay silent.
pub trait PipelineLogger: Send {
    /// Photos finished so far out of the photos scheduled for this run.
    fn progress(&mut self, current: usize, total: usize);

    /// Time one extraction stage took for one photo.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time measurement (e.g. batch failures).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulated timing for one stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total_ms: f64,
}

impl StageStats {
    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Reports through the `log` facade and prints a per-stage summary with
/// throughput at the end of the run.
///
/// Progress lines are throttled to one every `throttle_photos` photos.
pub struct StdoutPipelineLogger {
    throttle_photos: usize,
    stages: HashMap<String, StageStats>,
    metrics: HashMap<String, Vec<f64>>,
    started: Instant,
    photos_done: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_photos: usize) -> Self {
        Self {
            throttle_photos: throttle_photos.max(1),
            stages: HashMap::new(),
            metrics: HashMap::new(),
            started: Instant::now(),
            photos_done: 0,
        }
    }

    pub fn stage_stats(&self, stage: &str) -> Option<StageStats> {
        self.stages.get(stage).copied()
    }

    pub fn metric_values(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }

    /// `None` until something has been recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_s = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Run summary ({} photos, {elapsed_s:.1}s):",
            self.photos_done
        )];

        let mut names: Vec<&String> = self.stages.keys().collect();
        names.sort();
        for name in names {
            let stats = self.stages[name];
            lines.push(format!(
                "  {name:16}: avg {:7.1}ms  total {:8.0}ms  over {} photos",
                stats.average_ms(),
                stats.total_ms,
                stats.count
            ));
        }

        let mut names: Vec<&String> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let sum: f64 = values.iter().sum();
            lines.push(format!("  {name}: sum {sum:.0}"));
        }

        if self.photos_done > 0 && elapsed_s > 0.0 {
            let rate = self.photos_done as f64 / elapsed_s;
            lines.push(format!("  Throughput: {rate:.2} photos/s"));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.photos_done = current;
        if total > 0 && (current % self.throttle_photos == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processed {current}/{total} photos ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        let stats = self.stages.entry(stage.to_string()).or_default();
        stats.count += 1;
        stats.total_ms += duration_ms;
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
