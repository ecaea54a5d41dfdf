/// Progress accounting and reporting for a batch run.
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use super::stage::FileError;

/// Outcome of one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub attached: usize,
    pub unmatched: usize,
    /// `false` when the output equals the input and nothing was written.
    pub written: bool,
}

/// Completed/total counters. `completed` only grows and the state is
/// terminal once it reaches `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    completed: usize,
    total: usize,
}

impl ProgressState {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    /// Count one finished file, saturating at `total`.
    pub fn advance(&mut self) {
        if self.completed < self.total {
            self.completed += 1;
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.completed >= self.total
    }

    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.completed >= self.total {
            100.0
        } else if self.completed == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub comments_added: usize,
    pub failed_files: Vec<PathBuf>,
}

impl BatchSummary {
    pub(crate) fn record(&mut self, outcome: &Result<FileReport, FileError>) {
        match outcome {
            Ok(report) => {
                self.succeeded += 1;
                self.comments_added += report.attached;
            }
            Err(err) => {
                self.failed += 1;
                self.failed_files.push(err.path.clone());
            }
        }
    }

    /// Files that finished, successfully or not.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Receives batch events. Called from the single aggregator task only.
pub trait ProgressReporter: Send {
    fn on_start(&mut self, _files: &[PathBuf]) {}
    fn on_file_started(&mut self, _path: &Path) {}
    fn on_file_finished(&mut self, _outcome: &Result<FileReport, FileError>) {}
    fn on_progress(&mut self, _progress: &ProgressState) {}
    fn on_complete(&mut self, _summary: &BatchSummary) {}
}

/// Reporter that discards every event.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

fn progress_line(progress: &ProgressState) -> String {
    format!(
        "Progress: {}/{}, {:.2}%",
        progress.completed(),
        progress.total(),
        progress.percent()
    )
}

/// Terminal reporter with an `indicatif` progress bar. When the bar is hidden
/// (output is not a terminal) a progress line is printed after each file.
pub struct ConsoleReporter {
    bar: ProgressBar,
    last: Option<ProgressState>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            last: None,
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_start(&mut self, files: &[PathBuf]) {
        let list: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        println!(
            "» Comments will be added to these go files soon:\n{}\n",
            list.join("\n")
        );

        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        self.bar = bar;
    }

    fn on_file_started(&mut self, path: &Path) {
        self.bar.println(format!("» Processing {}...", path.display()));
    }

    fn on_file_finished(&mut self, outcome: &Result<FileReport, FileError>) {
        match outcome {
            Ok(report) => self.bar.println(format!(
                "✔ Processed file {} ({} comments added)",
                report.path.display(),
                report.attached
            )),
            Err(err) => self.bar.println(format!("× Error: {err}")),
        }
    }

    fn on_progress(&mut self, progress: &ProgressState) {
        self.bar.set_position(progress.completed() as u64);
        if self.bar.is_hidden() {
            // No bar to look at, so report every step.
            println!("{}", progress_line(progress));
            self.last = None;
        } else {
            self.last = Some(*progress);
        }
    }

    fn on_complete(&mut self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        if let Some(progress) = self.last.take() {
            println!("{}", progress_line(&progress));
        }
        if summary.failed > 0 {
            println!(
                "{} of {} files failed, see the log for details.",
                summary.failed, summary.total
            );
        }
        println!("\nAll files processed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pipeline::stage::Stage;

    #[test]
    fn test_progress_percent() {
        let mut progress = ProgressState::new(4);
        assert_eq!(progress.percent(), 0.0);
        progress.advance();
        assert_eq!(progress.percent(), 25.0);
        progress.advance();
        progress.advance();
        progress.advance();
        assert!(progress.is_terminal());
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn test_progress_saturates() {
        let mut progress = ProgressState::new(1);
        progress.advance();
        progress.advance();
        assert_eq!(progress.completed(), 1);
    }

    #[test]
    fn test_empty_batch_is_terminal() {
        let progress = ProgressState::new(0);
        assert!(progress.is_terminal());
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn test_summary_records_outcomes() {
        let mut summary = BatchSummary {
            total: 2,
            ..BatchSummary::default()
        };
        summary.record(&Ok(FileReport {
            path: PathBuf::from("a.go"),
            attached: 3,
            unmatched: 0,
            written: true,
        }));
        summary.record(&Err(FileError {
            path: PathBuf::from("b.go"),
            stage: Stage::AwaitingAnnotation,
            source: Error::AnnotationService("down".into()),
        }));
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.comments_added, 3);
        assert_eq!(summary.completed(), 2);
        assert_eq!(summary.failed_files, vec![PathBuf::from("b.go")]);
    }

    #[test]
    fn test_progress_line() {
        let mut progress = ProgressState::new(3);
        progress.advance();
        assert_eq!(progress_line(&progress), "Progress: 1/3, 33.33%");
    }

    #[test]
    fn test_hidden_bar_reports_each_step() {
        let mut reporter = ConsoleReporter::default();
        assert!(reporter.bar.is_hidden());

        let mut progress = ProgressState::new(2);
        progress.advance();
        reporter.on_progress(&progress);
        // Already printed inline, nothing is deferred to completion.
        assert!(reporter.last.is_none());
        assert_eq!(reporter.bar.position(), 1);
    }
}
