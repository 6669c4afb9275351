//! Vault Upload Library
//!
//! Large-object uploads and retrievals for Glacier-style archival vaults.
//!
//! # Modules
//!
//! - `range`: Inclusive byte ranges for part uploads
//! - `slicing`: Part size policy and payload slicing
//! - `hash`: SHA-256 tree hashing
//! - `upload`: Multipart and single-request upload strategies
//! - `jobs`: Waiting on asynchronous retrieval jobs
//! - `storage`: Vault service traits and an in-memory vault
//! - `client`: High-level archive operations

pub mod client;
pub mod config;
pub mod error;
pub mod hash;
pub mod jobs;
pub mod range;
pub mod slicing;
pub mod storage;
pub mod upload;
pub mod validation;

pub use client::VaultClient;
pub use config::Config;
pub use error::{Error, Result};

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;
