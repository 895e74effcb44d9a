//! # Audit Events
//!
//! Append-only record of every state-changing operation. Events are written
//! in the same critical section as the mutation they describe, carry a
//! closed action vocabulary, and are never updated or deleted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use av_core::Timestamp;

/// Closed vocabulary of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    EvidenceCreated,
    EvidenceFileUploaded,
    EvidenceLinked,
    EvidenceUnlinked,
    ControlVerified,
    ControlRejected,
    StatusDemoted,
    NoteCreated,
    NoteResolved,
    NoteReopened,
    ExportQueued,
    ExportCreated,
    ExportFailed,
    AlertRaised,
    AlertCleared,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvidenceCreated => "EVIDENCE_CREATED",
            Self::EvidenceFileUploaded => "EVIDENCE_FILE_UPLOADED",
            Self::EvidenceLinked => "EVIDENCE_LINKED",
            Self::EvidenceUnlinked => "EVIDENCE_UNLINKED",
            Self::ControlVerified => "CONTROL_VERIFIED",
            Self::ControlRejected => "CONTROL_REJECTED",
            Self::StatusDemoted => "STATUS_DEMOTED",
            Self::NoteCreated => "NOTE_CREATED",
            Self::NoteResolved => "NOTE_RESOLVED",
            Self::NoteReopened => "NOTE_REOPENED",
            Self::ExportQueued => "EXPORT_QUEUED",
            Self::ExportCreated => "EXPORT_CREATED",
            Self::ExportFailed => "EXPORT_FAILED",
            Self::AlertRaised => "ALERT_RAISED",
            Self::AlertCleared => "ALERT_CLEARED",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub id: Uuid,
    /// Acting principal, or `None` for system-initiated events
    /// (worker transitions, alert reconciliation).
    pub actor: Option<String>,
    pub action: AuditAction,
    /// Entity type the event is about ("control", "evidence", ...).
    pub entity_type: String,
    /// Stringified id of the affected entity.
    pub entity_id: String,
    /// Short human-readable description.
    pub summary: String,
    pub created_at: Timestamp,
}

impl AuditEvent {
    pub fn new(
        actor: Option<String>,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        summary: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            summary: summary.into(),
            created_at: now,
        }
    }
}
