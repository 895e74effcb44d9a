//! # av-model — Domain Entities
//!
//! The persisted record types of the compliance engine. This crate holds
//! data and the small state machines that guard it (pack publishing, export
//! job transitions, note resolution); all derived-state computation lives in
//! `av-engine`, and storage lives in `av-store`.
//!
//! ## Crate Policy
//!
//! - Depends only on `av-core`.
//! - Every public type derives `Debug`, `Clone`, `Serialize`, `Deserialize`.
//! - Immutable records (verifications, audit events,
//!   completed export jobs) expose no mutating methods.

pub mod alert;
pub mod audit;
pub mod evidence;
pub mod export;
pub mod note;
pub mod pack;
pub mod rule;
pub mod status;
pub mod verification;

pub use alert::{AlertType, ComplianceAlert};
pub use audit::{AuditAction, AuditEvent};
pub use evidence::{EvidenceFile, EvidenceItem, EvidenceLink};
pub use export::{ExportJob, ExportKind, ExportStatus};
pub use note::{ControlNote, NoteType};
pub use pack::{Control, PackStatus, StandardPack};
pub use rule::{EvidenceRule, RuleError, RuleKind, RuleScope};
pub use status::{ComputedStatus, ControlStatus, RuleHint, RuleResult, StatusDetails};
pub use verification::{Verification, VerificationStatus};
