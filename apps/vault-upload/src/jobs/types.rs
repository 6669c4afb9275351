//! Job types for asynchronous vault retrievals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Status of a vault job, with the service's wire names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobAction {
    ArchiveRetrieval,
    InventoryRetrieval,
}

/// Parameters for starting a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    ArchiveRetrieval { archive_id: String },
    InventoryRetrieval,
}

impl JobRequest {
    pub fn action(&self) -> JobAction {
        match self {
            Self::ArchiveRetrieval { .. } => JobAction::ArchiveRetrieval,
            Self::InventoryRetrieval => JobAction::InventoryRetrieval,
        }
    }
}

/// A job as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobDescription {
    pub job_id: String,
    pub action: JobAction,
    pub status_code: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<String>,
    pub creation_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    pub completed: bool,
}

/// Identifies a job within a vault
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub container_id: String,
    pub job_id: String,
}

impl JobHandle {
    pub fn new(container_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            job_id: job_id.into(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Interrupted while waiting for job {job_id}")]
    Interrupted { job_id: String },

    #[error("Failed to describe job {job_id}: {source}")]
    Transport {
        job_id: String,
        #[source]
        source: StorageError,
    },
}
