use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use super_tidy_core::ProgressReporter;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress reporter using indicatif bars.
///
/// - Walk phase: spinner (unknown total files upfront)
/// - Fingerprint phases: progress bar over the items being read
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self { bar: Mutex::new(None) }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICKS)
}

impl ProgressReporter for CliReporter {
    fn on_walk_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(style("{spinner:.cyan} {msg}"));
        pb.set_message("Walking directories...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_walk_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Walk complete: {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_fingerprint_start(&self, total_items: usize) {
        if total_items == 0 {
            return;
        }
        let pb = ProgressBar::new(total_items as u64);
        pb.set_style(style(
            "  {spinner:.cyan} Reading [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_fingerprint_progress(&self, items_done: usize, _total_items: usize) {
        if let Some(pb) = self.bar().as_ref() {
            // Workers finish out of order; never move the bar backwards.
            if items_done as u64 > pb.position() {
                pb.set_position(items_done as u64);
            }
        }
    }

    fn on_fingerprint_complete(&self, skipped: usize, duration_secs: f64) {
        self.finish_bar();
        if skipped > 0 {
            eprintln!(
                "  \x1b[33m!\x1b[0m {} files skipped after {:.2}s",
                skipped, duration_secs
            );
        }
    }

    fn on_grouping_complete(&self, kind: &str, groups: usize) {
        eprintln!("  \x1b[32m✓\x1b[0m {} grouping complete: {} groups", kind, groups);
    }
}
