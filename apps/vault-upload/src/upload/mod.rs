//! Archive Upload Module
//!
//! Upload strategies for vault archives:
//! - `SequentialUploadStrategy`: multipart upload, one part at a time,
//!   aborted on the first failure
//! - `SinglePartUploadStrategy`: whole archive in one request
//!
//! Multipart flow:
//! 1. Pick the part size for the payload and initiate the upload
//! 2. Upload each slice in order, keeping the service's part hashes
//! 3. Reduce the part hashes to the archive tree hash and complete

pub mod sequential;
pub mod single_part;
pub mod types;

use async_trait::async_trait;

pub use sequential::SequentialUploadStrategy;
pub use single_part::SinglePartUploadStrategy;
pub use types::*;

/// A way of getting a blob into a vault
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    /// Upload `blob` into the vault `container_id`; returns the archive ID
    async fn execute(&self, container_id: &str, blob: &Blob) -> Result<String, UploadError>;
}
