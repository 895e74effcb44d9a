//! # Content Digest — Content-Addressed Identifiers
//!
//! `ContentDigest` tags a 32-byte SHA-256 value with its algorithm. Export
//! artifacts and evidence files are addressed and integrity-checked by
//! digest.
//!
//! Two computation paths exist, deliberately distinct:
//!
//! - [`sha256_digest()`] accepts only `&CanonicalBytes` — for structured
//!   payloads (export snapshots) where reproducibility requires
//!   canonicalization first.
//! - [`sha256_hex_of_bytes()`] hashes raw bytes — for uploaded evidence
//!   files, which are opaque blobs stored and verified byte-for-byte.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm that produced a content digest.
///
/// SHA-256 only today; the tag exists so stored digests remain
/// self-describing if the algorithm ever migrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 — standard content addressing.
    Sha256,
}

impl DigestAlgorithm {
    /// Algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a digest from raw bytes and algorithm. Prefer [`sha256_digest()`].
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl<'s> utoipa::ToSchema<'s> for ContentDigest {
    fn schema() -> (&'s str, utoipa::openapi::RefOr<utoipa::openapi::Schema>) {
        (
            "ContentDigest",
            utoipa::openapi::ObjectBuilder::new()
                .schema_type(utoipa::openapi::SchemaType::Object)
                .description(Some("Algorithm-tagged SHA-256 content digest"))
                .into(),
        )
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// The signature accepts only `&CanonicalBytes`, so every structured digest
/// in the system flows through the canonicalization pipeline.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Compute a SHA-256 hex string over raw bytes.
///
/// For opaque blobs (uploaded evidence files) that are stored and
/// integrity-checked byte-for-byte, without canonicalization.
pub fn sha256_hex_of_bytes(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

/// Compute a SHA-256 content digest over raw bytes.
///
/// For rendered artifacts whose bytes are already final (a renderer may
/// emit non-JSON formats that never pass through canonicalization).
pub fn sha256_digest_of_bytes(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}
