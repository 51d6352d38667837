//! Fingerprint service — SHA-256 content digests for change detection.

use sha2::{Digest, Sha256};

use crate::types::Fingerprint;

/// Digest `bytes` into a lower-case hex SHA-256 [`Fingerprint`].
///
/// Bytes are hashed verbatim; no line-ending or encoding normalisation.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from(hex::encode(hasher.finalize()))
}
