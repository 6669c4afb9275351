//! Single-request archive upload

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Blob, UploadError, UploadStage};
use super::UploadStrategy;
use crate::hash::TreeHash;
use crate::storage::ArchiveService;
use crate::validation::{validate_description, validate_single_upload_size, validate_vault_name};

/// Uploads the whole blob in one request, for payloads up to 4 GiB
pub struct SinglePartUploadStrategy<S> {
    service: Arc<S>,
}

impl<S: ArchiveService> SinglePartUploadStrategy<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: ArchiveService> UploadStrategy for SinglePartUploadStrategy<S> {
    async fn execute(&self, container_id: &str, blob: &Blob) -> Result<String, UploadError> {
        validate_vault_name(container_id)?;
        validate_description(&blob.name)?;
        validate_single_upload_size(blob.len())?;

        let hash = TreeHash::from_bytes(&blob.payload)?;

        let archive_id = self
            .service
            .upload_archive(container_id, &blob.name, &blob.payload, hash.tree)
            .await
            .map_err(UploadError::transport(UploadStage::UploadArchive))?;

        tracing::info!(
            vault = %container_id,
            archive_id = %archive_id,
            size = blob.len(),
            tree_hash = %hash.tree,
            "Uploaded archive"
        );

        Ok(archive_id)
    }
}
