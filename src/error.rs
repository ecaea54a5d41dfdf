//! Error taxonomy shared by discovery, the per-file pipeline and the annotator.
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while discovering or processing Go files.
///
/// Only [`Error::Discovery`] is fatal for a whole run; every other variant is
/// scoped to the file being processed.
#[derive(Error, Debug)]
pub enum Error {
    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing Go code: {0}")]
    Parse(String),

    #[error("failed to format Go code: {0}")]
    Format(String),

    #[error("package or import section not found")]
    BoilerplateNotFound,

    #[error("annotation service error: {0}")]
    AnnotationService(String),

    #[error("malformed annotation response: {0}")]
    ResponseFormat(#[from] serde_json::Error),

    #[error("re-serializing merged code: {0}")]
    MergeSerialization(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether the error aborts the whole run rather than a single file.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Discovery(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
