//! Concurrent per-file pipeline.
//!
//! Each file runs read → format → parse → elide → annotate → merge → format →
//! write on its own task. A semaphore bounds how many run at once and a single
//! aggregator task turns their events into progress.
pub mod progress;
pub mod stage;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{AcquireError, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::annotator::{self, AnnotationRequest, Annotator};
use crate::discovery::{self, Target};
use crate::elider;
use crate::error::Error;
use crate::formatter::Formatter;
use crate::merger;
use crate::syntax::SourceTree;
use crate::syntax::comments::CommentMap;

use progress::{BatchSummary, FileReport, ProgressReporter, ProgressState};
use stage::{FileError, FileTask, Stage};

/// Errors that stop a run as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discovery(#[from] Error),

    #[error("worker admission failed: {0}")]
    Admission(#[from] AcquireError),

    #[error("progress aggregator failed: {0}")]
    Aggregator(#[from] JoinError),
}

/// Result of [`Pipeline::run_target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Discovery found no eligible files; nothing was read or written.
    NothingToDo,
    Completed(BatchSummary),
}

/// Events sent by workers to the aggregator.
#[derive(Debug)]
enum FileEvent {
    Started(PathBuf),
    Finished(Result<FileReport, FileError>),
}

pub struct Pipeline {
    annotator: Arc<dyn Annotator>,
    formatter: Arc<dyn Formatter>,
    concurrency: usize,
    workdir: PathBuf,
}

impl Pipeline {
    pub fn new(
        annotator: Arc<dyn Annotator>,
        formatter: Arc<dyn Formatter>,
        concurrency: usize,
    ) -> Self {
        Self {
            annotator,
            formatter,
            concurrency: concurrency.max(1),
            workdir: PathBuf::from("."),
        }
    }

    /// Resolve change-set targets in the repository containing `workdir`.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Discover the files of `target` and process them.
    pub async fn run_target(
        &self,
        target: &Target,
        reporter: Box<dyn ProgressReporter>,
    ) -> Result<RunOutcome, PipelineError> {
        let files = discovery::discover_in(target, &self.workdir)?;
        if files.is_empty() {
            info!("No go files found for {target:?}");
            return Ok(RunOutcome::NothingToDo);
        }
        Ok(RunOutcome::Completed(self.run(files, reporter).await?))
    }

    /// Process `files`, at most `concurrency` at a time. Per-file failures are
    /// reported and counted; they never stop the batch.
    pub async fn run(
        &self,
        files: Vec<PathBuf>,
        mut reporter: Box<dyn ProgressReporter>,
    ) -> Result<BatchSummary, PipelineError> {
        let total = files.len();
        reporter.on_start(&files);
        if total == 0 {
            let summary = BatchSummary::default();
            reporter.on_complete(&summary);
            return Ok(summary);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(aggregate(rx, total, reporter));

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();
        for path in files {
            let permit = semaphore.clone().acquire_owned().await?;
            let tx = tx.clone();
            let annotator = self.annotator.clone();
            let formatter = self.formatter.clone();
            workers.spawn(async move {
                let _permit = permit;
                let _ = tx.send(FileEvent::Started(path.clone()));
                let outcome = process_file(&path, annotator.as_ref(), formatter.as_ref()).await;
                let _ = tx.send(FileEvent::Finished(outcome));
            });
        }
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Worker task failed: {e}");
            }
        }

        Ok(aggregator.await?)
    }
}

/// Single consumer of worker events; owns the progress counters.
async fn aggregate(
    mut rx: mpsc::UnboundedReceiver<FileEvent>,
    total: usize,
    mut reporter: Box<dyn ProgressReporter>,
) -> BatchSummary {
    let mut progress = ProgressState::new(total);
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };

    while let Some(event) = rx.recv().await {
        match event {
            FileEvent::Started(path) => reporter.on_file_started(&path),
            FileEvent::Finished(outcome) => {
                if let Err(err) = &outcome {
                    error!("× Error: {err}");
                }
                summary.record(&outcome);
                reporter.on_file_finished(&outcome);
                progress.advance();
                reporter.on_progress(&progress);
                if progress.is_terminal() {
                    break;
                }
            }
        }
    }

    if !progress.is_terminal() {
        warn!(
            "Batch ended with {}/{} files accounted for",
            progress.completed(),
            progress.total()
        );
    }
    info!(
        "All files processed: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    reporter.on_complete(&summary);
    summary
}

/// Run the full pipeline for one file. The file is only rewritten when every
/// stage succeeds.
pub async fn process_file(
    path: &Path,
    annotator: &dyn Annotator,
    formatter: &dyn Formatter,
) -> Result<FileReport, FileError> {
    let mut task = FileTask::new(path);
    info!("Processing file: {}", path.display());

    task.enter(Stage::Reading);
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        task.fail(Error::Read {
            path: path.to_path_buf(),
            source,
        })
    })?;
    let original = String::from_utf8(bytes).map_err(|e| {
        task.fail(Error::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    })?;

    task.enter(Stage::Formatting);
    let canonical = formatter.format(&original).await.map_err(|e| task.fail(e))?;
    debug!("Go code before process:\n{canonical}");

    task.enter(Stage::Parsing);
    let tree = SourceTree::parse(canonical).map_err(|e| task.fail(e))?;
    let docs = CommentMap::derive(&tree);

    task.enter(Stage::Eliding);
    let payload = elider::prepare_payload(&tree).map_err(|e| task.fail(e))?;
    debug!("Go code after process:\n{payload}");

    task.enter(Stage::AwaitingAnnotation);
    let reply = annotator
        .annotate(&AnnotationRequest::new(payload))
        .await
        .map_err(|e| task.fail(e))?;
    let response = annotator::parse_response(&reply).map_err(|e| task.fail(e))?;

    task.enter(Stage::Merging);
    let merged = merger::merge(&tree, &docs, &response.comments).map_err(|e| task.fail(e))?;
    for entry in &merged.unmatched {
        debug!(
            "No undocumented declaration matches position {:?} in {}",
            entry.position,
            path.display()
        );
    }

    task.enter(Stage::Reformatting);
    let output = formatter
        .format(&merged.source)
        .await
        .map_err(|e| task.fail(e))?;

    task.enter(Stage::Writing);
    let written = output != original;
    if written {
        write_atomic(path, output).await.map_err(|source| {
            task.fail(Error::Write {
                path: path.to_path_buf(),
                source,
            })
        })?;
    }
    task.enter(Stage::Done);

    info!(
        "Processed file: {} ({} comments added, {} unmatched)",
        path.display(),
        merged.attached,
        merged.unmatched.len()
    );
    Ok(FileReport {
        path: path.to_path_buf(),
        attached: merged.attached,
        unmatched: merged.unmatched.len(),
        written,
    })
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, keeping the original permissions.
async fn write_atomic(path: &Path, contents: String) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        if let Ok(metadata) = std::fs::metadata(&path) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}
