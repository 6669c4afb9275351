//! Tree Hash
//!
//! Computes the linear and tree SHA-256 hashes of a payload in a single
//! sequential pass over 1 MiB chunks.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::types::{HashError, Sha256Hash};
use crate::MIB;

/// Leaf chunk size of the tree hash: 1 MiB
pub const TREE_HASH_CHUNK_SIZE: u64 = MIB;

/// Linear and tree hash of one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeHash {
    /// SHA-256 of the whole payload
    pub linear: Sha256Hash,
    /// Root of the pairwise reduction of the 1 MiB leaf hashes
    pub tree: Sha256Hash,
}

impl TreeHash {
    /// Hash an in-memory payload
    pub fn from_bytes(payload: &[u8]) -> Result<Self, HashError> {
        let mut linear = Sha256::new();
        let leaves: Vec<Sha256Hash> = payload
            .chunks(TREE_HASH_CHUNK_SIZE as usize)
            .map(|chunk| {
                linear.update(chunk);
                Sha256Hash::digest(chunk)
            })
            .collect();

        Self::finish(linear, leaves)
    }

    /// Hash a stream, reading it once to the end
    pub async fn from_reader<R: AsyncRead + Unpin>(mut reader: R) -> Result<Self, HashError> {
        let mut linear = Sha256::new();
        let mut leaves = Vec::new();
        let mut chunk = Vec::with_capacity(TREE_HASH_CHUNK_SIZE as usize);

        loop {
            chunk.clear();
            let read = (&mut reader)
                .take(TREE_HASH_CHUNK_SIZE)
                .read_to_end(&mut chunk)
                .await?;
            if read == 0 {
                break;
            }

            linear.update(&chunk);
            leaves.push(Sha256Hash::digest(&chunk));

            if (read as u64) < TREE_HASH_CHUNK_SIZE {
                break;
            }
        }

        Self::finish(linear, leaves)
    }

    /// Hash a file on disk
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HashError> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        Self::from_reader(tokio::io::BufReader::new(file)).await
    }

    fn finish(linear: Sha256, leaves: Vec<Sha256Hash>) -> Result<Self, HashError> {
        if leaves.is_empty() {
            return Err(HashError::EmptyPayload);
        }

        let linear = Sha256Hash::from_bytes(linear.finalize().into());
        let tree = reduce_to_root(leaves)?;
        Ok(Self { linear, tree })
    }
}

/// Reduce an ordered list of hashes to its tree root
///
/// Adjacent pairs are combined left to right; an odd hash at the end of a
/// level is carried up unchanged.
pub fn reduce_to_root(mut hashes: Vec<Sha256Hash>) -> Result<Sha256Hash, HashError> {
    if hashes.is_empty() {
        return Err(HashError::EmptyInput);
    }

    while hashes.len() > 1 {
        hashes = hashes
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => left.combine(right),
                _ => pair[0],
            })
            .collect();
    }

    Ok(hashes[0])
}

/// Tree root of per-part hashes, in ascending part order
pub fn tree_hash_from_map(parts: &BTreeMap<u32, Sha256Hash>) -> Result<Sha256Hash, HashError> {
    if parts.is_empty() {
        return Err(HashError::EmptyMap);
    }
    reduce_to_root(parts.values().copied().collect())
}

// ============================================================================
// Tests
// ============================================================================
