//! Vault Client
//!
//! High-level archive operations over an [`ArchiveService`]: uploads with
//! strategy selection by size, and retrievals that wait on the
//! service's asynchronous jobs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::jobs::{JobRequest, PollingStrategy, ScheduledPoller};
use crate::slicing::ChunkSizeCalculator;
use crate::storage::{ArchiveService, Inventory, StorageError};
use crate::upload::{Blob, SequentialUploadStrategy, SinglePartUploadStrategy, UploadStrategy};
use crate::validation::validate_vault_name;

/// Archive operations against one vault service
pub struct VaultClient<S> {
    service: Arc<S>,
    config: Config,
    cancel: CancellationToken,
}

impl<S: ArchiveService> VaultClient<S> {
    pub fn new(service: Arc<S>, config: Config) -> Self {
        Self {
            service,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `token` interrupts retrievals that are waiting on a job
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn multipart_strategy(&self) -> SequentialUploadStrategy<S> {
        SequentialUploadStrategy::new(
            self.service.clone(),
            ChunkSizeCalculator::from_config(&self.config.upload),
        )
    }

    pub fn single_part_strategy(&self) -> SinglePartUploadStrategy<S> {
        SinglePartUploadStrategy::new(self.service.clone())
    }

    pub fn poller(&self) -> ScheduledPoller<S> {
        ScheduledPoller::new(self.service.clone(), &self.config.polling)
            .with_cancellation(self.cancel.clone())
    }

    // ========================================================================
    // Vaults and Uploads
    // ========================================================================

    pub async fn create_vault(&self, name: &str) -> Result<()> {
        validate_vault_name(name)?;
        self.service.create_vault(name).await?;
        tracing::info!(vault = %name, "Created vault");
        Ok(())
    }

    /// Upload a blob, using multipart upload above the configured threshold
    pub async fn put_archive(&self, vault: &str, blob: &Blob) -> Result<String> {
        if blob.len() > self.config.upload.multipart_threshold {
            self.put_archive_with(&self.multipart_strategy(), vault, blob).await
        } else {
            self.put_archive_with(&self.single_part_strategy(), vault, blob).await
        }
    }

    /// Upload a blob with a caller-chosen strategy
    pub async fn put_archive_with(
        &self,
        strategy: &dyn UploadStrategy,
        vault: &str,
        blob: &Blob,
    ) -> Result<String> {
        Ok(strategy.execute(vault, blob).await?)
    }

    // ========================================================================
    // Retrievals
    // ========================================================================

    /// Fetch an archive's contents
    ///
    /// Returns `None` if the retrieval job failed or disappeared.
    pub async fn retrieve_archive(&self, vault: &str, archive_id: &str) -> Result<Option<Vec<u8>>> {
        let job_id = self
            .service
            .initiate_job(
                vault,
                JobRequest::ArchiveRetrieval {
                    archive_id: archive_id.to_string(),
                },
            )
            .await?;

        tracing::info!(vault = %vault, archive_id = %archive_id, job_id = %job_id, "Started archive retrieval");

        self.job_output(vault, &job_id).await
    }

    /// Fetch the vault's inventory
    pub async fn retrieve_inventory(&self, vault: &str) -> Result<Option<Inventory>> {
        let job_id = self
            .service
            .initiate_job(vault, JobRequest::InventoryRetrieval)
            .await?;

        tracing::info!(vault = %vault, job_id = %job_id, "Started inventory retrieval");

        match self.job_output(vault, &job_id).await? {
            Some(output) => {
                let inventory = serde_json::from_slice(&output)
                    .map_err(|e| StorageError::MalformedResponse(format!("inventory: {}", e)))?;
                Ok(Some(inventory))
            }
            None => Ok(None),
        }
    }

    async fn job_output(&self, vault: &str, job_id: &str) -> Result<Option<Vec<u8>>> {
        if !self.poller().wait_for_completion(vault, job_id).await? {
            tracing::warn!(vault = %vault, job_id = %job_id, "Job did not succeed, no output");
            return Ok(None);
        }

        Ok(Some(self.service.get_job_output(vault, job_id).await?))
    }
}

// ============================================================================
// Tests
// ============================================================================
