/// Per-file processing stages.
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Error;

/// Where a file is in its pipeline. Stages only move forward and `Done` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Pending,
    Reading,
    Formatting,
    Parsing,
    Eliding,
    AwaitingAnnotation,
    Merging,
    Reformatting,
    Writing,
    Done,
    Failed,
}

impl Stage {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_enter(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Stage::Failed || next > self
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Reading => "reading",
            Stage::Formatting => "formatting",
            Stage::Parsing => "parsing",
            Stage::Eliding => "eliding",
            Stage::AwaitingAnnotation => "awaiting annotation",
            Stage::Merging => "merging",
            Stage::Reformatting => "reformatting",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file error tagged with the stage it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{source} (stage: {stage}, file: {})", .path.display())]
pub struct FileError {
    pub path: PathBuf,
    pub stage: Stage,
    #[source]
    pub source: Error,
}

/// Tracks the stage of one file through the pipeline.
#[derive(Debug)]
pub struct FileTask {
    path: PathBuf,
    stage: Stage,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stage: Stage::Pending,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `next`. Illegal transitions are ignored and logged.
    pub fn enter(&mut self, next: Stage) {
        if self.stage.can_enter(next) {
            self.stage = next;
        } else {
            warn!(
                "Ignoring transition {} -> {next} for {}",
                self.stage,
                self.path.display()
            );
        }
    }

    /// Record `source` as the failure of the current stage and mark the task
    /// failed.
    pub fn fail(&mut self, source: Error) -> FileError {
        let stage = self.stage;
        self.enter(Stage::Failed);
        FileError {
            path: self.path.clone(),
            stage,
            source,
        }
    }
}
