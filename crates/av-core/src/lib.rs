//! # av-core — Foundational Types for AccrediVault
//!
//! Defines the primitive types every other crate in the workspace builds on:
//! identifier newtypes, the UTC-only `Timestamp`, canonical byte production
//! for digest computation, the tagged `ContentDigest`, and the error taxonomy.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ControlId`, `EvidenceId`,
//!    `ExportJobId` and friends are distinct types — you cannot pass an
//!    evidence id where a control id is expected.
//!
//! 2. **`CanonicalBytes` newtype.** All artifact digest computation flows
//!    through `CanonicalBytes::new()` (RFC 8785 JCS). Never raw
//!    `serde_json::to_vec()` for digests; non-canonical serialization would
//!    make the same snapshot hash differently between runs.
//!
//! 3. **UTC-only timestamps.** `Timestamp` enforces UTC with Z suffix and
//!    seconds precision, so timestamps embedded in canonical payloads are
//!    byte-stable.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `av-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{
    sha256_digest, sha256_digest_of_bytes, sha256_hex, sha256_hex_of_bytes, ContentDigest,
    DigestAlgorithm,
};
pub use error::AvError;
pub use identity::{
    AlertId, ControlId, EvidenceFileId, EvidenceId, ExportJobId, LinkId, NoteId, PackId, RuleId,
    VerificationId,
};
pub use temporal::Timestamp;
