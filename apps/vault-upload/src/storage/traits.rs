//! Vault service traits

use async_trait::async_trait;

use super::types::StorageError;
use crate::hash::Sha256Hash;
use crate::jobs::{JobDescription, JobRequest};
use crate::range::ContentRange;

/// Multipart upload operations of a vault service
#[async_trait]
pub trait MultipartUploads: Send + Sync {
    /// Start an upload whose parts (all but the last) are `part_size_bytes` long
    async fn initiate_upload(
        &self,
        container_id: &str,
        part_size_bytes: u64,
        blob_name: &str,
    ) -> Result<String, StorageError>;

    /// Upload one part; returns the service's tree hash of the part
    async fn upload_part(
        &self,
        container_id: &str,
        upload_id: &str,
        range: ContentRange,
        data: &[u8],
    ) -> Result<Sha256Hash, StorageError>;

    /// Assemble the uploaded parts into an archive; returns the archive ID
    async fn complete_upload(
        &self,
        container_id: &str,
        upload_id: &str,
        tree_hash: Sha256Hash,
        total_len: u64,
    ) -> Result<String, StorageError>;

    async fn abort_upload(&self, container_id: &str, upload_id: &str) -> Result<(), StorageError>;
}

/// Job status lookups
#[async_trait]
pub trait JobDescriber: Send + Sync {
    /// Current state of a job, or `None` if the service does not know it
    async fn describe_job(
        &self,
        container_id: &str,
        job_id: &str,
    ) -> Result<Option<JobDescription>, StorageError>;
}

/// The full vault surface used by [`crate::client::VaultClient`]
#[async_trait]
pub trait ArchiveService: MultipartUploads + JobDescriber {
    async fn create_vault(&self, name: &str) -> Result<(), StorageError>;

    /// Upload a whole archive in one request
    async fn upload_archive(
        &self,
        container_id: &str,
        description: &str,
        data: &[u8],
        tree_hash: Sha256Hash,
    ) -> Result<String, StorageError>;

    async fn initiate_job(&self, container_id: &str, request: JobRequest) -> Result<String, StorageError>;

    async fn get_job_output(&self, container_id: &str, job_id: &str) -> Result<Vec<u8>, StorageError>;
}
