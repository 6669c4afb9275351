//! Sequential Multipart Upload
//!
//! Uploads parts strictly in order with one request in flight. Any failure
//! after the upload has been initiated aborts the whole upload; parts are
//! never retried individually.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Blob, UploadError, UploadSession, UploadStage};
use super::UploadStrategy;
use crate::hash::HashError;
use crate::slicing::{ChunkSizeCalculator, SlicingSession};
use crate::storage::MultipartUploads;
use crate::validation::{validate_description, validate_vault_name};

/// Multipart upload, one part at a time
pub struct SequentialUploadStrategy<S> {
    service: Arc<S>,
    calculator: ChunkSizeCalculator,
}

impl<S: MultipartUploads> SequentialUploadStrategy<S> {
    pub fn new(service: Arc<S>, calculator: ChunkSizeCalculator) -> Self {
        Self { service, calculator }
    }

    /// Abort a multipart upload
    pub async fn abort(&self, container_id: &str, upload_id: &str) -> Result<(), UploadError> {
        self.service
            .abort_upload(container_id, upload_id)
            .await
            .map_err(|source| UploadError::AbortFailed {
                upload_id: upload_id.to_string(),
                source,
            })
    }

    /// Upload every slice, then complete. Returns the archive ID.
    async fn upload_parts(
        &self,
        session: &mut UploadSession,
        slices: &mut SlicingSession<'_>,
    ) -> Result<String, UploadError> {
        while slices.has_next() {
            let slice = slices.next_slice()?;

            let hash = self
                .service
                .upload_part(
                    session.container_id(),
                    session.upload_id(),
                    slice.range,
                    slice.bytes,
                )
                .await
                .map_err(UploadError::transport(UploadStage::UploadPart(slice.part_number)))?;

            tracing::debug!(
                upload_id = %session.upload_id(),
                part = slice.part_number,
                range = %slice.range,
                hash = %hash,
                "Uploaded part"
            );

            session.record_part(slice.part_number, slice.range.len(), hash);
        }

        let tree_hash = session.aggregate_hash()?;
        self.service
            .complete_upload(
                session.container_id(),
                session.upload_id(),
                tree_hash,
                slices.total_len(),
            )
            .await
            .map_err(UploadError::transport(UploadStage::Complete))
    }

    async fn abort_after_failure(&self, session: &mut UploadSession, error: &UploadError) {
        session.mark_aborted();

        tracing::warn!(
            vault = %session.container_id(),
            upload_id = %session.upload_id(),
            parts_uploaded = session.part_hashes().len(),
            error = %error,
            "Aborting multipart upload"
        );

        // The original error is what the caller sees; an abort failure is only logged.
        if let Err(abort_error) = self.abort(session.container_id(), session.upload_id()).await {
            tracing::error!(
                upload_id = %session.upload_id(),
                error = %abort_error,
                "Failed to abort multipart upload"
            );
        }
    }
}

#[async_trait]
impl<S: MultipartUploads> UploadStrategy for SequentialUploadStrategy<S> {
    async fn execute(&self, container_id: &str, blob: &Blob) -> Result<String, UploadError> {
        validate_vault_name(container_id)?;
        validate_description(&blob.name)?;
        if blob.is_empty() {
            return Err(HashError::EmptyPayload.into());
        }

        let mut slices = self.calculator.start_slicing(&blob.payload);
        let part_size_bytes = slices.part_size_bytes();

        let upload_id = self
            .service
            .initiate_upload(container_id, part_size_bytes, &blob.name)
            .await
            .map_err(UploadError::transport(UploadStage::Initiate))?;

        let mut session = UploadSession::initiated(container_id, upload_id, part_size_bytes);

        tracing::info!(
            vault = %container_id,
            upload_id = %session.upload_id(),
            size = blob.len(),
            part_size = part_size_bytes,
            "Initiated multipart upload"
        );

        match self.upload_parts(&mut session, &mut slices).await {
            Ok(archive_id) => {
                session.mark_completed();
                tracing::info!(
                    vault = %container_id,
                    upload_id = %session.upload_id(),
                    archive_id = %archive_id,
                    parts = session.part_hashes().len(),
                    size = session.bytes_copied(),
                    "Completed multipart upload"
                );
                Ok(archive_id)
            }
            Err(error) => {
                self.abort_after_failure(&mut session, &error).await;
                Err(error)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
