//! Upload types

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::hash::{tree_hash_from_map, HashError, Sha256Hash};
use crate::slicing::SlicingError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

// ============================================================================
// Blob
// ============================================================================

/// An archive to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Archive description, stored alongside the archive
    pub name: String,
    pub payload: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Multipart upload state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    /// Nothing sent to the service yet. An [`UploadSession`] is only
    /// created once the upload is initiated, so this state is implicit
    /// before that point and never stored in a session.
    Idle,
    /// Upload ID obtained, no parts sent
    Initiated,
    /// At least one part accepted
    Uploading,
    /// Archive assembled by the service
    Completed,
    /// Upload abandoned after a failure
    Aborted,
}

/// State of one multipart upload
///
/// Owned by a single upload call for its whole lifetime.
#[derive(Debug)]
pub struct UploadSession {
    upload_id: String,
    container_id: String,
    part_size_bytes: u64,
    hashes: BTreeMap<u32, Sha256Hash>,
    bytes_copied: u64,
    state: UploadState,
}

impl UploadSession {
    /// Session for an upload the service has just initiated
    pub fn initiated(container_id: &str, upload_id: String, part_size_bytes: u64) -> Self {
        Self {
            upload_id,
            container_id: container_id.to_string(),
            part_size_bytes,
            hashes: BTreeMap::new(),
            bytes_copied: 0,
            state: UploadState::Initiated,
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn part_size_bytes(&self) -> u64 {
        self.part_size_bytes
    }

    pub fn bytes_copied(&self) -> u64 {
        self.bytes_copied
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn part_hashes(&self) -> &BTreeMap<u32, Sha256Hash> {
        &self.hashes
    }

    /// Record the service's hash for an accepted part
    pub fn record_part(&mut self, part_number: u32, len: u64, hash: Sha256Hash) {
        self.hashes.insert(part_number, hash);
        self.bytes_copied += len;
        self.state = UploadState::Uploading;
    }

    /// Tree hash of the whole archive, from the recorded part hashes
    pub fn aggregate_hash(&self) -> Result<Sha256Hash, HashError> {
        tree_hash_from_map(&self.hashes)
    }

    pub fn mark_completed(&mut self) {
        self.state = UploadState::Completed;
    }

    pub fn mark_aborted(&mut self) {
        self.state = UploadState::Aborted;
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Service call that failed during an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Initiate,
    UploadPart(u32),
    Complete,
    UploadArchive,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiate => write!(f, "initiate upload"),
            Self::UploadPart(part) => write!(f, "upload part {}", part),
            Self::Complete => write!(f, "complete upload"),
            Self::UploadArchive => write!(f, "upload archive"),
        }
    }
}

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Slicing(#[from] SlicingError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("Failed to {stage}: {source}")]
    Transport {
        stage: UploadStage,
        #[source]
        source: StorageError,
    },

    #[error("Failed to abort upload {upload_id}: {source}")]
    AbortFailed {
        upload_id: String,
        #[source]
        source: StorageError,
    },
}

impl UploadError {
    pub(crate) fn transport(stage: UploadStage) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Transport { stage, source }
    }
}
