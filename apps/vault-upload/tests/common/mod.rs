//! Shared test doubles for upload tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use vault_upload::hash::Sha256Hash;
use vault_upload::range::ContentRange;
use vault_upload::storage::{MultipartUploads, StorageError};

pub const UPLOAD_ID: &str = "upload-7f3a";
pub const ARCHIVE_ID: &str = "archive-91c2";

/// A call made against the vault service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initiate {
        container_id: String,
        part_size: u64,
        blob_name: String,
    },
    UploadPart {
        upload_id: String,
        range: ContentRange,
        len: usize,
    },
    Complete {
        upload_id: String,
        tree_hash: Sha256Hash,
        total_len: u64,
    },
    Abort {
        upload_id: String,
    },
}

/// Vault service double that records calls and fails on demand
pub struct RecordingVault {
    part_hash: Sha256Hash,
    fail_initiate: bool,
    fail_part: Option<usize>,
    fail_complete: bool,
    fail_abort: bool,
    calls: Mutex<Vec<Call>>,
    parts_seen: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingVault {
    /// Every accepted part returns `part_hash`
    pub fn new(part_hash: Sha256Hash) -> Self {
        Self {
            part_hash,
            fail_initiate: false,
            fail_part: None,
            fail_complete: false,
            fail_abort: false,
            calls: Mutex::new(Vec::new()),
            parts_seen: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_initiate(mut self) -> Self {
        self.fail_initiate = true;
        self
    }

    /// Fail the `index`-th part upload (0-based)
    pub fn failing_part(mut self, index: usize) -> Self {
        self.fail_part = Some(index);
        self
    }

    pub fn failing_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn failing_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn aborts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Abort { upload_id } => Some(upload_id),
                _ => None,
            })
            .collect()
    }

    pub fn part_ranges(&self) -> Vec<ContentRange> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UploadPart { range, .. } => Some(range),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl MultipartUploads for RecordingVault {
    async fn initiate_upload(
        &self,
        container_id: &str,
        part_size_bytes: u64,
        blob_name: &str,
    ) -> Result<String, StorageError> {
        self.record(Call::Initiate {
            container_id: container_id.to_string(),
            part_size: part_size_bytes,
            blob_name: blob_name.to_string(),
        });
        if self.fail_initiate {
            return Err(StorageError::Transport("initiate refused".to_string()));
        }
        Ok(UPLOAD_ID.to_string())
    }

    async fn upload_part(
        &self,
        _container_id: &str,
        upload_id: &str,
        range: ContentRange,
        data: &[u8],
    ) -> Result<Sha256Hash, StorageError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        self.record(Call::UploadPart {
            upload_id: upload_id.to_string(),
            range,
            len: data.len(),
        });
        tokio::task::yield_now().await;

        let index = self.parts_seen.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_part == Some(index) {
            return Err(StorageError::Transport(format!("connection reset on part {}", index)));
        }
        Ok(self.part_hash)
    }

    async fn complete_upload(
        &self,
        _container_id: &str,
        upload_id: &str,
        tree_hash: Sha256Hash,
        total_len: u64,
    ) -> Result<String, StorageError> {
        self.record(Call::Complete {
            upload_id: upload_id.to_string(),
            tree_hash,
            total_len,
        });
        if self.fail_complete {
            return Err(StorageError::Rejected("tree hash mismatch".to_string()));
        }
        Ok(ARCHIVE_ID.to_string())
    }

    async fn abort_upload(&self, _container_id: &str, upload_id: &str) -> Result<(), StorageError> {
        self.record(Call::Abort {
            upload_id: upload_id.to_string(),
        });
        if self.fail_abort {
            return Err(StorageError::Transport("abort timed out".to_string()));
        }
        Ok(())
    }
}
