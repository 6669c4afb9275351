//! In-memory Vault Service
//!
//! A process-local vault that checks uploads the way the real service does:
//! - Part size declared at initiate must be a power of two MiB
//! - Parts must start on a part boundary and carry exactly their range
//! - Completion recomputes the archive tree hash and rejects mismatches
//!
//! Jobs finish after a configurable number of status lookups.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::traits::{ArchiveService, JobDescriber, MultipartUploads};
use super::types::{ArchiveRecord, Inventory, StorageError};
use crate::hash::{Sha256Hash, TreeHash};
use crate::jobs::{JobDescription, JobRequest, JobStatus};
use crate::range::ContentRange;
use crate::validation::{
    validate_description, validate_part_size, validate_single_upload_size, validate_vault_name,
};

// ============================================================================
// Memory Vault
// ============================================================================

/// In-memory vault service
#[derive(Clone, Default)]
pub struct MemoryVault {
    inner: Arc<MemoryVaultInner>,
}

#[derive(Default)]
struct MemoryVaultInner {
    vaults: Mutex<HashMap<String, Vault>>,

    /// Status lookups a job stays `InProgress` for
    job_latency: u32,
}

struct Vault {
    arn: String,
    archives: BTreeMap<String, StoredArchive>,
    uploads: HashMap<String, PendingUpload>,
    jobs: HashMap<String, Job>,
}

struct StoredArchive {
    description: String,
    data: Arc<Vec<u8>>,
    tree_hash: Sha256Hash,
    created_at: DateTime<Utc>,
}

struct PendingUpload {
    part_size: u64,
    description: String,
    /// Part data keyed by range start
    parts: BTreeMap<u64, Vec<u8>>,
}

struct Job {
    description: JobDescription,
    lookups: u32,
    output: JobOutput,
}

enum JobOutput {
    Archive(Arc<Vec<u8>>),
    Inventory(Vec<u8>),
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs report `InProgress` for the first `lookups` status lookups
    pub fn with_job_latency(lookups: u32) -> Self {
        Self {
            inner: Arc::new(MemoryVaultInner {
                vaults: Mutex::new(HashMap::new()),
                job_latency: lookups,
            }),
        }
    }

    /// Force a job into the `Failed` state
    pub fn fail_job(&self, container_id: &str, job_id: &str, message: &str) -> Result<(), StorageError> {
        let mut vaults = self.inner.vaults.lock();
        let job = vaults
            .get_mut(container_id)
            .and_then(|vault| vault.jobs.get_mut(job_id))
            .ok_or_else(|| StorageError::NotFound(format!("job {}", job_id)))?;

        let now = Utc::now();
        job.description.status_code = JobStatus::Failed;
        job.description.status_message = Some(message.to_string());
        job.description.completed = true;
        job.description.completion_date = Some(now);
        Ok(())
    }

    /// Number of uploads that are neither completed nor aborted
    pub fn pending_uploads(&self, container_id: &str) -> usize {
        self.inner
            .vaults
            .lock()
            .get(container_id)
            .map(|vault| vault.uploads.len())
            .unwrap_or(0)
    }

    /// Raw archive contents, bypassing retrieval jobs
    pub fn archive_data(&self, container_id: &str, archive_id: &str) -> Option<Vec<u8>> {
        let vaults = self.inner.vaults.lock();
        vaults
            .get(container_id)
            .and_then(|vault| vault.archives.get(archive_id))
            .map(|archive| archive.data.as_ref().clone())
    }

    fn with_vault<T>(
        &self,
        container_id: &str,
        f: impl FnOnce(&mut Vault) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut vaults = self.inner.vaults.lock();
        let vault = vaults
            .get_mut(container_id)
            .ok_or_else(|| StorageError::NotFound(format!("vault {}", container_id)))?;
        f(vault)
    }
}

impl Vault {
    fn upload(&mut self, upload_id: &str) -> Result<&mut PendingUpload, StorageError> {
        self.uploads
            .get_mut(upload_id)
            .ok_or_else(|| StorageError::NotFound(format!("upload {}", upload_id)))
    }

    fn store_archive(&mut self, description: String, data: Vec<u8>, tree_hash: Sha256Hash) -> String {
        let archive_id = Uuid::new_v4().simple().to_string();
        self.archives.insert(
            archive_id.clone(),
            StoredArchive {
                description,
                data: Arc::new(data),
                tree_hash,
                created_at: Utc::now(),
            },
        );
        archive_id
    }

    fn inventory(&self) -> Inventory {
        Inventory {
            vault_arn: self.arn.clone(),
            inventory_date: Utc::now(),
            archive_list: self
                .archives
                .iter()
                .map(|(id, archive)| ArchiveRecord {
                    archive_id: id.clone(),
                    archive_description: archive.description.clone(),
                    creation_date: archive.created_at,
                    size: archive.data.len() as u64,
                    sha256_tree_hash: archive.tree_hash,
                })
                .collect(),
        }
    }
}

impl PendingUpload {
    /// Concatenate the parts, checking that they tile `[0, total_len)`
    fn assemble(&self, total_len: u64) -> Result<Vec<u8>, StorageError> {
        let uploaded: u64 = self.parts.values().map(|part| part.len() as u64).sum();
        if uploaded != total_len {
            return Err(StorageError::Rejected(format!(
                "uploaded {} bytes, archive size declared as {}",
                uploaded, total_len
            )));
        }

        let mut data = Vec::with_capacity(uploaded as usize);
        let last = self.parts.keys().next_back().copied();

        for (&from, part) in &self.parts {
            if from != data.len() as u64 {
                return Err(StorageError::Rejected(format!(
                    "missing data before offset {}",
                    from
                )));
            }
            if Some(from) != last && part.len() as u64 != self.part_size {
                return Err(StorageError::Rejected(format!(
                    "part at offset {} is {} bytes, expected {}",
                    from,
                    part.len(),
                    self.part_size
                )));
            }
            data.extend_from_slice(part);
        }

        Ok(data)
    }
}

fn tree_hash_of(data: &[u8]) -> Result<Sha256Hash, StorageError> {
    TreeHash::from_bytes(data)
        .map(|hash| hash.tree)
        .map_err(|e| StorageError::Rejected(e.to_string()))
}

// ============================================================================
// Trait Implementations
// ============================================================================

#[async_trait]
impl MultipartUploads for MemoryVault {
    async fn initiate_upload(
        &self,
        container_id: &str,
        part_size_bytes: u64,
        blob_name: &str,
    ) -> Result<String, StorageError> {
        validate_part_size(part_size_bytes)?;
        validate_description(blob_name)?;

        self.with_vault(container_id, |vault| {
            let upload_id = Uuid::new_v4().simple().to_string();
            vault.uploads.insert(
                upload_id.clone(),
                PendingUpload {
                    part_size: part_size_bytes,
                    description: blob_name.to_string(),
                    parts: BTreeMap::new(),
                },
            );
            Ok(upload_id)
        })
    }

    async fn upload_part(
        &self,
        container_id: &str,
        upload_id: &str,
        range: ContentRange,
        data: &[u8],
    ) -> Result<Sha256Hash, StorageError> {
        self.with_vault(container_id, |vault| {
            let upload = vault.upload(upload_id)?;

            if range.from() % upload.part_size != 0 {
                return Err(StorageError::Rejected(format!(
                    "range {} does not start on a {} byte part boundary",
                    range, upload.part_size
                )));
            }
            if range.len() > upload.part_size {
                return Err(StorageError::Rejected(format!(
                    "range {} is larger than the part size {}",
                    range, upload.part_size
                )));
            }
            if range.len() != data.len() as u64 {
                return Err(StorageError::Rejected(format!(
                    "range {} does not match body length {}",
                    range,
                    data.len()
                )));
            }

            let hash = tree_hash_of(data)?;
            upload.parts.insert(range.from(), data.to_vec());
            Ok(hash)
        })
    }

    async fn complete_upload(
        &self,
        container_id: &str,
        upload_id: &str,
        tree_hash: Sha256Hash,
        total_len: u64,
    ) -> Result<String, StorageError> {
        self.with_vault(container_id, |vault| {
            let upload = vault.upload(upload_id)?;
            let data = upload.assemble(total_len)?;

            let actual = tree_hash_of(&data)?;
            if actual != tree_hash {
                return Err(StorageError::Rejected(format!(
                    "tree hash mismatch: declared {}, computed {}",
                    tree_hash, actual
                )));
            }

            let description = upload.description.clone();
            vault.uploads.remove(upload_id);
            Ok(vault.store_archive(description, data, actual))
        })
    }

    async fn abort_upload(&self, container_id: &str, upload_id: &str) -> Result<(), StorageError> {
        self.with_vault(container_id, |vault| {
            vault
                .uploads
                .remove(upload_id)
                .map(|_| ())
                .ok_or_else(|| StorageError::NotFound(format!("upload {}", upload_id)))
        })
    }
}

#[async_trait]
impl JobDescriber for MemoryVault {
    async fn describe_job(
        &self,
        container_id: &str,
        job_id: &str,
    ) -> Result<Option<JobDescription>, StorageError> {
        let mut vaults = self.inner.vaults.lock();
        let Some(job) = vaults
            .get_mut(container_id)
            .and_then(|vault| vault.jobs.get_mut(job_id))
        else {
            return Ok(None);
        };

        job.lookups += 1;
        if job.description.status_code == JobStatus::InProgress && job.lookups > self.inner.job_latency {
            job.description.status_code = JobStatus::Succeeded;
            job.description.status_message = Some("Succeeded".to_string());
            job.description.completed = true;
            job.description.completion_date = Some(Utc::now());
        }

        Ok(Some(job.description.clone()))
    }
}

#[async_trait]
impl ArchiveService for MemoryVault {
    async fn create_vault(&self, name: &str) -> Result<(), StorageError> {
        validate_vault_name(name)?;

        let mut vaults = self.inner.vaults.lock();
        vaults.entry(name.to_string()).or_insert_with(|| Vault {
            arn: format!("arn:aws:glacier:local:000000000000:vaults/{}", name),
            archives: BTreeMap::new(),
            uploads: HashMap::new(),
            jobs: HashMap::new(),
        });
        Ok(())
    }

    async fn upload_archive(
        &self,
        container_id: &str,
        description: &str,
        data: &[u8],
        tree_hash: Sha256Hash,
    ) -> Result<String, StorageError> {
        validate_description(description)?;
        validate_single_upload_size(data.len() as u64)?;

        let actual = tree_hash_of(data)?;
        if actual != tree_hash {
            return Err(StorageError::Rejected(format!(
                "tree hash mismatch: declared {}, computed {}",
                tree_hash, actual
            )));
        }

        self.with_vault(container_id, |vault| {
            Ok(vault.store_archive(description.to_string(), data.to_vec(), actual))
        })
    }

    async fn initiate_job(&self, container_id: &str, request: JobRequest) -> Result<String, StorageError> {
        self.with_vault(container_id, |vault| {
            let (archive_id, output) = match &request {
                JobRequest::ArchiveRetrieval { archive_id } => {
                    let archive = vault
                        .archives
                        .get(archive_id)
                        .ok_or_else(|| StorageError::NotFound(format!("archive {}", archive_id)))?;
                    (Some(archive_id.clone()), JobOutput::Archive(archive.data.clone()))
                }
                JobRequest::InventoryRetrieval => {
                    let inventory = serde_json::to_vec(&vault.inventory())
                        .map_err(|e| StorageError::MalformedResponse(e.to_string()))?;
                    (None, JobOutput::Inventory(inventory))
                }
            };

            let job_id = Uuid::new_v4().simple().to_string();
            let description = JobDescription {
                job_id: job_id.clone(),
                action: request.action(),
                status_code: JobStatus::InProgress,
                status_message: None,
                archive_id,
                creation_date: Utc::now(),
                completion_date: None,
                completed: false,
            };
            vault.jobs.insert(
                job_id.clone(),
                Job {
                    description,
                    lookups: 0,
                    output,
                },
            );
            Ok(job_id)
        })
    }

    async fn get_job_output(&self, container_id: &str, job_id: &str) -> Result<Vec<u8>, StorageError> {
        self.with_vault(container_id, |vault| {
            let job = vault
                .jobs
                .get(job_id)
                .ok_or_else(|| StorageError::NotFound(format!("job {}", job_id)))?;

            if job.description.status_code != JobStatus::Succeeded {
                return Err(StorageError::Rejected(format!(
                    "job {} has not succeeded ({:?})",
                    job_id, job.description.status_code
                )));
            }

            Ok(match &job.output {
                JobOutput::Archive(data) => data.as_ref().clone(),
                JobOutput::Inventory(json) => json.clone(),
            })
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MIB;

    async fn vault_with(name: &str) -> MemoryVault {
        let vault = MemoryVault::new();
        vault.create_vault(name).await.unwrap();
        vault
    }

    #[tokio::test]
    async fn test_unknown_vault() {
        let vault = MemoryVault::new();
        let result = vault.initiate_upload("missing", MIB, "desc").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_initiate_rejects_bad_part_size() {
        let vault = vault_with("v").await;
        let result = vault.initiate_upload("v", 3 * MIB, "desc").await;
        assert!(matches!(result, Err(StorageError::Validation(_))));
    }

    #[tokio::test]
    async fn test_part_must_be_aligned_and_sized() {
        let vault = vault_with("v").await;
        let upload_id = vault.initiate_upload("v", MIB, "desc").await.unwrap();

        let misaligned = ContentRange::build(10, 20).unwrap();
        let result = vault.upload_part("v", &upload_id, misaligned, &[0u8; 11]).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));

        let short_body = ContentRange::from_part_number(0, 1).unwrap();
        let result = vault.upload_part("v", &upload_id, short_body, &[0u8; 10]).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));

        let oversized = ContentRange::build(0, 2 * MIB - 1).unwrap();
        let data = vec![0u8; (2 * MIB) as usize];
        let result = vault.upload_part("v", &upload_id, oversized, &data).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_multipart_roundtrip() {
        let vault = vault_with("v").await;
        let data: Vec<u8> = (0..(2 * MIB + 100)).map(|i| (i % 7) as u8).collect();
        let upload_id = vault.initiate_upload("v", MIB, "backup").await.unwrap();

        let mut part_hashes = BTreeMap::new();
        for (i, part) in data.chunks(MIB as usize).enumerate() {
            let range = ContentRange::spanning(i as u64 * MIB, part.len() as u64);
            let hash = vault.upload_part("v", &upload_id, range, part).await.unwrap();
            part_hashes.insert(i as u32, hash);
        }

        let tree_hash = crate::hash::tree_hash_from_map(&part_hashes).unwrap();
        let archive_id = vault
            .complete_upload("v", &upload_id, tree_hash, data.len() as u64)
            .await
            .unwrap();

        assert_eq!(vault.archive_data("v", &archive_id).unwrap(), data);
        assert_eq!(vault.pending_uploads("v"), 0);
    }

    #[tokio::test]
    async fn test_complete_rejects_gaps_and_bad_hash() {
        let vault = vault_with("v").await;
        let upload_id = vault.initiate_upload("v", MIB, "gap").await.unwrap();

        let part = vec![1u8; MIB as usize];
        let range = ContentRange::from_part_number(1, 1).unwrap();
        let hash = vault.upload_part("v", &upload_id, range, &part).await.unwrap();

        let result = vault.complete_upload("v", &upload_id, hash, 2 * MIB).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));

        let range = ContentRange::from_part_number(0, 1).unwrap();
        vault.upload_part("v", &upload_id, range, &part).await.unwrap();
        let wrong = Sha256Hash::digest(b"wrong");
        let result = vault.complete_upload("v", &upload_id, wrong, 2 * MIB).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));

        // Still pending after rejected completions
        assert_eq!(vault.pending_uploads("v"), 1);
    }

    #[tokio::test]
    async fn test_complete_rejects_wrong_total_length() {
        let vault = vault_with("v").await;
        let upload_id = vault.initiate_upload("v", MIB, "short").await.unwrap();

        let range = ContentRange::build(0, 9).unwrap();
        let hash = vault.upload_part("v", &upload_id, range, &[7u8; 10]).await.unwrap();

        for declared in [u64::MAX, 11, 9] {
            let result = vault.complete_upload("v", &upload_id, hash, declared).await;
            assert!(matches!(result, Err(StorageError::Rejected(_))), "declared {}", declared);
        }

        let archive_id = vault.complete_upload("v", &upload_id, hash, 10).await.unwrap();
        assert_eq!(vault.archive_data("v", &archive_id).unwrap(), vec![7u8; 10]);
    }

    #[tokio::test]
    async fn test_abort_discards_upload() {
        let vault = vault_with("v").await;
        let upload_id = vault.initiate_upload("v", MIB, "desc").await.unwrap();

        vault.abort_upload("v", &upload_id).await.unwrap();
        assert_eq!(vault.pending_uploads("v"), 0);
        assert!(matches!(
            vault.abort_upload("v", &upload_id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let vault = MemoryVault::with_job_latency(2);
        vault.create_vault("v").await.unwrap();

        let data = b"archive body".to_vec();
        let hash = TreeHash::from_bytes(&data).unwrap().tree;
        let archive_id = vault.upload_archive("v", "small", &data, hash).await.unwrap();

        let job_id = vault
            .initiate_job("v", JobRequest::ArchiveRetrieval { archive_id })
            .await
            .unwrap();

        let statuses: Vec<JobStatus> = {
            let mut statuses = Vec::new();
            for _ in 0..3 {
                let job = vault.describe_job("v", &job_id).await.unwrap().unwrap();
                statuses.push(job.status_code);
            }
            statuses
        };
        assert_eq!(
            statuses,
            vec![JobStatus::InProgress, JobStatus::InProgress, JobStatus::Succeeded]
        );
        assert_eq!(vault.get_job_output("v", &job_id).await.unwrap(), data);

        assert!(vault.describe_job("v", "nope").await.unwrap().is_none());
        assert!(vault.describe_job("missing", &job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_job_has_no_output() {
        let vault = MemoryVault::with_job_latency(5);
        vault.create_vault("v").await.unwrap();

        let job_id = vault
            .initiate_job("v", JobRequest::InventoryRetrieval)
            .await
            .unwrap();
        vault.fail_job("v", &job_id, "expired").unwrap();

        let job = vault.describe_job("v", &job_id).await.unwrap().unwrap();
        assert_eq!(job.status_code, JobStatus::Failed);
        assert!(job.completed);
        assert!(matches!(
            vault.get_job_output("v", &job_id).await,
            Err(StorageError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_archive_checks_hash() {
        let vault = vault_with("v").await;
        let result = vault
            .upload_archive("v", "desc", b"data", Sha256Hash::digest(b"other"))
            .await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
    }
}
