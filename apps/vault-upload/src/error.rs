//! Error types for vault uploads and retrievals

use thiserror::Error;

use crate::config::ConfigError;
use crate::hash::HashError;
use crate::jobs::PollError;
use crate::range::RangeError;
use crate::slicing::SlicingError;
use crate::storage::StorageError;
use crate::upload::UploadError;
use crate::validation::ValidationError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Slicing error: {0}")]
    Slicing(#[from] SlicingError),

    #[error("Tree hash error: {0}")]
    Hash(#[from] HashError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Job polling error: {0}")]
    Poll(#[from] PollError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the operation was cancelled rather than failed
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Poll(PollError::Interrupted { .. }))
    }
}
