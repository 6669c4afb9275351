//! Tree Hash Module
//!
//! SHA-256 tree hashing for archive integrity:
//! - Leaf hashes over fixed 1 MiB chunks of the payload
//! - Pairwise reduction of leaf (or part) hashes to a single root
//! - A linear SHA-256 over the whole payload, computed in the same pass
//!
//! Part hashes returned by the service are tree hashes of the part, so the
//! root of the part hashes equals the root of the leaf hashes whenever the
//! part size is a power-of-two number of MiB.

pub mod tree_hash;
pub mod types;

pub use tree_hash::{reduce_to_root, tree_hash_from_map, TreeHash, TREE_HASH_CHUNK_SIZE};
pub use types::{HashError, Sha256Hash};
