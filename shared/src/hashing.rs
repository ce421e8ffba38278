//! Content hashing for import deduplication

use sha2::{Digest, Sha256};

/// SHA-256 of a source file's bytes, hex encoded.
///
/// Used as the dedup token for sales imports and kept on inventory headers
/// for diagnostics.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
