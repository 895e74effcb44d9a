//! Control notes: inspector remarks and corrective actions attached to a
//! control. Unresolved corrective-action notes cap the computed status at
//! IN_PROGRESS, so resolution state changes feed back into the engine.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use av_core::{AvError, ControlId, NoteId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteType {
    /// Internal working note.
    Internal,
    /// Remark recorded during an inspection.
    Inspection,
    /// A deficiency that must be remediated before the control can
    /// progress past IN_PROGRESS.
    CorrectiveAction,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::Inspection => "INSPECTION",
            Self::CorrectiveAction => "CORRECTIVE_ACTION",
        }
    }
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note attached to a control.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ControlNote {
    pub id: NoteId,
    pub control_id: ControlId,
    pub note_type: NoteType,
    pub body: String,
    pub created_by: String,
    pub created_at: Timestamp,
    /// Set when the note is resolved. Only meaningful for
    /// CORRECTIVE_ACTION notes but tracked for all.
    pub resolved_at: Option<Timestamp>,
    pub resolved_by: Option<String>,
}

impl ControlNote {
    pub fn new(
        control_id: ControlId,
        note_type: NoteType,
        body: impl Into<String>,
        created_by: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: NoteId::new(),
            control_id,
            note_type,
            body: body.into(),
            created_by: created_by.into(),
            created_at: now,
            resolved_at: None,
            resolved_by: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Whether this note blocks the control from progressing.
    pub fn is_blocking(&self) -> bool {
        self.note_type == NoteType::CorrectiveAction && !self.is_resolved()
    }

    pub fn resolve(&mut self, by: impl Into<String>, now: Timestamp) -> Result<(), AvError> {
        if self.is_resolved() {
            return Err(AvError::Conflict("note is already resolved".to_string()));
        }
        self.resolved_at = Some(now);
        self.resolved_by = Some(by.into());
        Ok(())
    }

    pub fn reopen(&mut self) -> Result<(), AvError> {
        if !self.is_resolved() {
            return Err(AvError::Conflict("note is not resolved".to_string()));
        }
        self.resolved_at = None;
        self.resolved_by = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(kind: NoteType) -> ControlNote {
        ControlNote::new(
            ControlId::new(),
            kind,
            "missing calibration certificate",
            "inspector",
            Timestamp::parse("2026-05-01T09:00:00Z").unwrap(),
        )
    }

    #[test]
    fn test_corrective_action_blocks_until_resolved() {
        let mut n = note(NoteType::CorrectiveAction);
        assert!(n.is_blocking());

        let t = Timestamp::parse("2026-05-02T09:00:00Z").unwrap();
        n.resolve("supervisor", t).unwrap();
        assert!(!n.is_blocking());
        assert_eq!(n.resolved_by.as_deref(), Some("supervisor"));
    }

    #[test]
    fn test_other_note_types_never_block() {
        assert!(!note(NoteType::Internal).is_blocking());
        assert!(!note(NoteType::Inspection).is_blocking());
    }

    #[test]
    fn test_double_resolve_conflicts() {
        let mut n = note(NoteType::CorrectiveAction);
        let t = Timestamp::parse("2026-05-02T09:00:00Z").unwrap();
        n.resolve("supervisor", t).unwrap();
        assert!(matches!(n.resolve("supervisor", t), Err(AvError::Conflict(_))));
    }

    #[test]
    fn test_reopen_restores_blocking() {
        let mut n = note(NoteType::CorrectiveAction);
        assert!(matches!(n.reopen(), Err(AvError::Conflict(_))));

        let t = Timestamp::parse("2026-05-02T09:00:00Z").unwrap();
        n.resolve("supervisor", t).unwrap();
        n.reopen().unwrap();
        assert!(n.is_blocking());
        assert!(n.resolved_by.is_none());
    }
}
