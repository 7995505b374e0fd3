// Batch tally
//
// Running counters for one folder run. Owned and mutated only by the batch
// loop, so plain integers are enough.

use crate::models::transfer::PipelineResult;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BatchTally {
    /// Files handed to the pipeline
    pub files_seen: usize,

    /// Files accepted by the destination
    pub succeeded: usize,

    /// Source files removed after a successful transfer
    pub deleted: usize,

    /// Total time spent inside per-file pipelines
    pub total_time: Duration,

    start_time: Instant,
}

impl BatchTally {
    pub fn new() -> Self {
        Self {
            files_seen: 0,
            succeeded: 0,
            deleted: 0,
            total_time: Duration::ZERO,
            start_time: Instant::now(),
        }
    }

    /// Record a finished file
    pub fn record(&mut self, result: &PipelineResult) {
        self.files_seen += 1;
        if result.success {
            self.succeeded += 1;
        }
        if result.source_deleted {
            self.deleted += 1;
        }
        self.total_time += result.duration;
    }

    pub fn failed(&self) -> usize {
        self.files_seen - self.succeeded
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get average pipeline time per file in milliseconds
    pub fn avg_file_time_ms(&self) -> f64 {
        if self.files_seen > 0 {
            self.total_time.as_millis() as f64 / self.files_seen as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Batch Summary ===");
        tracing::info!(
            "Files: {} succeeded, {} failed, {} deleted",
            self.succeeded,
            self.failed(),
            self.deleted
        );
        tracing::info!(
            "Elapsed: {:.2}s (avg: {:.2}ms per file)",
            self.elapsed().as_secs_f64(),
            self.avg_file_time_ms()
        );
    }
}

impl Default for BatchTally {
    fn default() -> Self {
        Self::new()
    }
}

/// "X of Y succeeded."
impl fmt::Display for BatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} succeeded.", self.succeeded, self.files_seen)
    }
}
