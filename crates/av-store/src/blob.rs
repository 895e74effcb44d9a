//! # Blob Storage
//!
//! Content-hash-verified byte storage behind a trait, with an in-memory
//! implementation. Evidence files live in the `evidence` bucket, export
//! artifacts in `exports`.
//!
//! ## Security Invariant
//!
//! Every read recomputes the SHA-256 of the stored bytes and compares it
//! to the hash recorded at write time. A mismatch is storage corruption
//! and surfaces as [`AvError::Integrity`] — a compliance artifact is never
//! served with silently altered content.

use dashmap::DashMap;

use av_core::{sha256_hex_of_bytes, AvError};

/// Bucket for uploaded evidence files.
pub const EVIDENCE_BUCKET: &str = "evidence";
/// Bucket for rendered export artifacts.
pub const EXPORTS_BUCKET: &str = "exports";

/// Byte storage keyed by (bucket, object key).
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning their SHA-256 hex digest.
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<String, AvError>;

    /// Fetch bytes, verifying content integrity.
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AvError>;

    fn contains(&self, bucket: &str, key: &str) -> bool;
}

struct StoredBlob {
    bytes: Vec<u8>,
    sha256: String,
}

/// In-memory [`BlobStore`].
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<(String, String), StoredBlob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn tamper(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        if let Some(mut entry) =
            self.objects.get_mut(&(bucket.to_string(), key.to_string()))
        {
            entry.bytes = bytes;
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<String, AvError> {
        let sha256 = sha256_hex_of_bytes(bytes);
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredBlob { bytes: bytes.to_vec(), sha256: sha256.clone() },
        );
        Ok(sha256)
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AvError> {
        let entry = self
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| AvError::NotFound(format!("blob {bucket}/{key}")))?;

        let actual = sha256_hex_of_bytes(&entry.bytes);
        if actual != entry.sha256 {
            return Err(AvError::Integrity(format!(
                "blob {bucket}/{key}: stored hash {} does not match content hash {actual}",
                entry.sha256
            )));
        }
        Ok(entry.bytes.clone())
    }

    fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let store = MemoryBlobStore::new();
        let digest = store.put(EVIDENCE_BUCKET, "a/report.pdf", b"bytes").unwrap();
        assert_eq!(digest, sha256_hex_of_bytes(b"bytes"));
        assert_eq!(store.get(EVIDENCE_BUCKET, "a/report.pdf").unwrap(), b"bytes");
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.get(EVIDENCE_BUCKET, "nope").unwrap_err();
        assert!(matches!(err, AvError::NotFound(_)));
    }

    #[test]
    fn test_corruption_detected_on_read() {
        let store = MemoryBlobStore::new();
        store.put(EXPORTS_BUCKET, "job.json", b"original").unwrap();
        store.tamper(EXPORTS_BUCKET, "job.json", b"tampered".to_vec());

        let err = store.get(EXPORTS_BUCKET, "job.json").unwrap_err();
        assert!(matches!(err, AvError::Integrity(_)));
    }
}
