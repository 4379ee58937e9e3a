//! Progress bars for the outer fixed-point search
//!
//! Visual feedback while the terminal variance is walked down, using the
//! indicatif crate.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::model::{IterationObserver, IterationReport, Termination};

/// Progress bar over the iteration budget, showing the current variance gap
pub struct ConvergenceProgress {
    pub progress: ProgressBar,
    pub max_iterations: usize,
}

impl ConvergenceProgress {
    pub fn new(max_iterations: usize) -> Self {
        let progress = ProgressBar::new(max_iterations as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}\n{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        Self { progress, max_iterations }
    }

    /// Bar that draws nothing, for non-interactive runs
    pub fn hidden(max_iterations: usize) -> Self {
        Self {
            progress: ProgressBar::hidden(),
            max_iterations,
        }
    }
}

impl IterationObserver for ConvergenceProgress {
    fn on_iteration(&mut self, report: &IterationReport) {
        self.progress.set_position(report.iteration as u64);
        self.progress.set_message(format!(
            "🎯 SIGMA_N {:.4} | SIGMA_0 {:.6} | gap {:+.6}",
            report.terminal_variance, report.initial_variance, report.gap
        ));
    }

    fn on_finish(&mut self, termination: Termination, iterations: usize) {
        let message = match termination {
            Termination::Converged => format!("✅ Converged after {} iterations", iterations),
            Termination::IterationBudgetExhausted => {
                format!("⚠️  Budget of {} iterations exhausted", self.max_iterations)
            }
            Termination::Cancelled => format!("❌ Cancelled after {} iterations", iterations),
        };
        self.progress.finish_with_message(message);
    }
}

/// Spinner for quick operations
pub struct Spinner {
    pub spinner: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message.to_string());

        Self { spinner }
    }

    pub fn finish(&self, message: &str) {
        self.spinner.finish_with_message(format!("✅ {}", message));
    }

    pub fn finish_with_error(&self, message: &str) {
        self.spinner.finish_with_message(format!("❌ {}", message));
    }
}
