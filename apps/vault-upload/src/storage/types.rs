//! Storage types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::Sha256Hash;
use crate::validation::ValidationError;

/// One archive as listed in a vault inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveRecord {
    pub archive_id: String,
    pub archive_description: String,
    pub creation_date: DateTime<Utc>,
    pub size: u64,
    #[serde(rename = "SHA256TreeHash")]
    pub sha256_tree_hash: Sha256Hash,
}

/// Output of an inventory retrieval job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Inventory {
    #[serde(rename = "VaultARN")]
    pub vault_arn: String,
    pub inventory_date: DateTime<Utc>,
    pub archive_list: Vec<ArchiveRecord>,
}

/// Errors reported by a vault service
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
}
