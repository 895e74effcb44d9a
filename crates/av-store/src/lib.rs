//! # av-store: Storage and Orchestration
//!
//! Authoritative in-memory stores for every compliance entity, plus the
//! service layer that sequences mutations correctly:
//!
//! - [`store`] — generic thread-safe record store and the typed registry.
//! - [`locks`] — per-control mutual exclusion for transition serialization.
//! - [`blob`] — content-hash-verified blob storage behind a trait.
//! - [`audit`] — append-only audit log with filtered queries.
//! - [`service`] — [`ComplianceService`], the single entry point for all
//!   state changes: every mutation runs "mutate + recompute + reconcile +
//!   audit" inside its control's critical section.
//!
//! ## Security Invariant
//!
//! No caller mutates a store directly. All writes flow through
//! [`ComplianceService`], which guarantees the cached status, the alert
//! set, and the audit trail can never disagree with the evidence records.

pub mod audit;
pub mod blob;
pub mod locks;
pub mod service;
pub mod store;

pub use audit::{AuditLog, AuditQuery, AUDIT_QUERY_CAP};
pub use blob::{BlobStore, MemoryBlobStore, EVIDENCE_BUCKET, EXPORTS_BUCKET};
pub use locks::ControlLocks;
pub use service::{ComplianceService, ControlTimeline, EvidenceDraft, SweepOutcome, TimelineEntry};
pub use store::{Registry, Store};
