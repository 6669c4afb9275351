//! Storage module for Glacier-style vault services
//!
//! The upload and polling code talks to the service only through the
//! traits in [`traits`]. [`MemoryVault`] is an in-process implementation
//! that enforces the same part and tree-hash rules as the real service.

mod memory;
mod traits;
mod types;

pub use memory::MemoryVault;
pub use traits::{ArchiveService, JobDescriber, MultipartUploads};
pub use types::*;
