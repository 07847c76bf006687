//! Error type of the scalar transplant.
//!
//! Every layer above the transplant itself (batch, pipeline, config) reports
//! through `anyhow`; only the core operation has a closed error set.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`TransplantError`].
pub type Result<T> = std::result::Result<T, TransplantError>;

/// Errors returned by [`crate::processing::transplant::transplant`].
///
/// None of them is retried; the caller decides whether a batch continues.
#[derive(Error, Debug)]
pub enum TransplantError {
    /// The source mesh could not be read or parsed.
    #[error("failed to read source mesh {path}: {message}")]
    SourceRead {
        /// The source file path.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// The target mesh could not be read or parsed.
    #[error("failed to read target mesh {path}: {message}")]
    TargetRead {
        /// The target file path.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// The source mesh has no point array with the requested name.
    #[error("point attribute '{name}' not found in {path}")]
    AttributeNotFound {
        /// The requested attribute name.
        name: String,
        /// The source file path.
        path: PathBuf,
    },

    /// The source array does not have one tuple per target point.
    #[error("attribute '{name}' has {array_len} tuples but target mesh has {target_points} points")]
    PointCountMismatch {
        /// The attribute name.
        name: String,
        /// Number of tuples in the source array.
        array_len: usize,
        /// Number of points in the target mesh.
        target_points: usize,
    },

    /// The updated target mesh could not be serialized or written.
    #[error("failed to write target mesh {path}: {message}")]
    Write {
        /// The target file path.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
}

impl TransplantError {
    /// Short, stable name of the error kind, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TransplantError::SourceRead { .. } => "SourceReadError",
            TransplantError::TargetRead { .. } => "TargetReadError",
            TransplantError::AttributeNotFound { .. } => "AttributeNotFound",
            TransplantError::PointCountMismatch { .. } => "PointCountMismatch",
            TransplantError::Write { .. } => "WriteError",
        }
    }
}
