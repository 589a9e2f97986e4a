//! Frame progress logging with ETA estimation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counts encoded frames and logs progress at a fixed interval
pub struct ProgressTracker {
    total: u64,
    processed: AtomicU64,
    start_time: Instant,
    label: String,
}

impl ProgressTracker {
    /// Creates a new progress tracker
    pub fn new(total: u64, label: &str) -> Self {
        Self {
            total,
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            label: label.to_string(),
        }
    }

    /// Frames counted so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Counts one frame, logging every `report_interval` frames and on completion
    pub fn increment_and_report(&self, report_interval: u64) {
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if current % report_interval.max(1) == 0 || current == self.total {
            self.report(current);
        }
    }

    fn report(&self, current: u64) {
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();

        if current < self.total {
            let percent = current as f64 / self.total as f64 * 100.0;
            let rate = current as f64 / elapsed_secs.max(f64::EPSILON);
            let remaining = (self.total - current) as f64 / rate;
            info!(
                "{} {}/{} ({:.1}%) - elapsed: {} - ETA: {}",
                self.label,
                current,
                self.total,
                percent,
                format_duration(elapsed_secs),
                format_duration(remaining),
            );
        } else {
            info!(
                "{} {}/{} (100.0%) - completed in {}",
                self.label,
                current,
                self.total,
                format_duration(elapsed_secs),
            );
        }
    }
}

/// Formats seconds into a human-readable duration string
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor() as u64;
        format!("{}m {:.0}s", mins, secs - mins as f64 * 60.0)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let rest = secs - hours as f64 * 3600.0;
        let mins = (rest / 60.0).floor() as u64;
        format!("{}h {}m {:.0}s", hours, mins, rest - mins as f64 * 60.0)
    }
}
