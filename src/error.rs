use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::processing::roles::Role;

/// Convenience result type for pipeline operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Stage of the pipeline an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Normalize,
    ResolveRoles,
    StatusFilter,
    Reshape,
    Aggregate,
    Fetch,
    Write,
    Compare,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Load => "load",
            PipelineStage::Normalize => "normalize",
            PipelineStage::ResolveRoles => "resolve_roles",
            PipelineStage::StatusFilter => "status_filter",
            PipelineStage::Reshape => "reshape",
            PipelineStage::Aggregate => "aggregate",
            PipelineStage::Fetch => "fetch",
            PipelineStage::Write => "write",
            PipelineStage::Compare => "compare",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric cell that is neither empty nor a zero sentinel and still fails to parse.
///
/// Returned by [`crate::processing::numeric::to_float`]; the pipeline lifts it into
/// [`IngestionError::NumericParse`] with file and column context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert value '{raw}' to a number")]
pub struct NumericParseError {
    /// The cell text exactly as it was read.
    pub raw: String,
}

/// Error type returned by the pipeline and its collaborators.
///
/// Fatal domain errors carry the input path and the failing [`PipelineStage`].
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An input file could not be read.
    #[error("cannot read input ({stage}) {path}: {source}")]
    InputIo {
        path: PathBuf,
        stage: PipelineStage,
        source: std::io::Error,
    },

    /// CSV reader/writer error outside of format detection.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet reader/writer error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// HTTP request failed, timed out, or returned a non-success status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The downloaded archive could not be opened.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON (de)serialization of profiles or comparison results failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// No encoding/delimiter combination produced a structurally valid table.
    #[error(
        "unreadable input ({stage}) {path}: no encoding/delimiter combination worked [{}]",
        .attempts.join("; ")
    )]
    UnreadableInput {
        path: PathBuf,
        stage: PipelineStage,
        /// One line per rejected combination, in attempt order.
        attempts: Vec<String>,
    },

    /// A mandatory semantic role could not be bound to any column.
    #[error("required column missing ({stage}) {path}: no column for role '{role}'. columns={available:?}")]
    RequiredColumnMissing {
        path: PathBuf,
        stage: PipelineStage,
        role: Role,
        available: Vec<String>,
    },

    /// A non-empty, non-sentinel numeric cell failed to parse.
    #[error("failed to parse number ({stage}) {path} at row {row} column '{column}' (raw='{raw}')")]
    NumericParse {
        path: PathBuf,
        stage: PipelineStage,
        row: usize,
        column: String,
        raw: String,
    },

    /// A summary file does not have the monthly record layout.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// An archive did not contain the expected delimited text file.
    #[error("archive error {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// A format profile or option set is inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl IngestionError {
    /// Wrap a failed read of the input at `path` as a load-stage error.
    pub fn input_io(path: &std::path::Path, source: std::io::Error) -> Self {
        IngestionError::InputIo {
            path: path.to_path_buf(),
            stage: PipelineStage::Load,
            source,
        }
    }

    /// Input path carried by the error, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            IngestionError::UnreadableInput { path, .. }
            | IngestionError::InputIo { path, .. }
            | IngestionError::RequiredColumnMissing { path, .. }
            | IngestionError::NumericParse { path, .. }
            | IngestionError::Archive { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Stage the error was raised in, if it is a domain error.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            IngestionError::UnreadableInput { stage, .. }
            | IngestionError::InputIo { stage, .. }
            | IngestionError::RequiredColumnMissing { stage, .. }
            | IngestionError::NumericParse { stage, .. } => Some(*stage),
            IngestionError::Http(_) | IngestionError::Zip(_) | IngestionError::Archive { .. } => {
                Some(PipelineStage::Fetch)
            }
            _ => None,
        }
    }
}
