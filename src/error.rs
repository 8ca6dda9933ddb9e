use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type shared by every pipeline stage.
///
/// Fatal errors only: recoverable data-quality anomalies (duplicates found,
/// values imputed) are reported as counts on [`crate::clean::CleanReport`] and
/// via [`crate::observe::PipelineObserver`], never through this enum. The one
/// exception is strict cleaning, which upgrades unresolved missing values to
/// [`PipelineError::DataQuality`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. source file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The table does not conform to the column-name contract of a stage
    /// (missing required columns, unusable input shape).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A raw value could not be parsed into the required
    /// [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// A data-quality anomaly escalated to fatal under strict options
    /// (see [`crate::clean::CleanOptions::fail_on_unresolved_missing`]).
    #[error("data quality: {message}")]
    DataQuality { message: String },

    /// An output table could not be persisted.
    #[error("failed to write '{path}': {message}")]
    Write { path: PathBuf, message: String },
}
