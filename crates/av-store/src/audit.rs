//! # Audit Log
//!
//! Append-only event sink. Records are written inside the same critical
//! section as the mutation they describe and are never updated or deleted;
//! queries return newest-first and are capped.

use std::sync::Arc;

use parking_lot::RwLock;

use av_core::Timestamp;
use av_model::AuditEvent;

/// Maximum rows any audit query returns.
pub const AUDIT_QUERY_CAP: usize = 200;

/// Filters for [`AuditLog::query`]. All fields are conjunctive; `None`
/// matches everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Case-insensitive substring match on the action code.
    pub action: Option<String>,
    /// Case-insensitive substring match on the entity type.
    pub entity_type: Option<String>,
    /// Case-insensitive substring match on summary, entity id, or actor.
    pub text: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

/// Append-only in-memory audit log. Cheaply cloneable; clones share data.
#[derive(Clone, Default)]
pub struct AuditLog {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Infallible by construction: appending to the
    /// in-process log cannot fail independently of the mutation it records.
    pub fn record(&self, event: AuditEvent) {
        tracing::debug!(
            action = event.action.as_str(),
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            "audit event"
        );
        self.events.write().push(event);
    }

    /// Filtered query, newest first, capped at [`AUDIT_QUERY_CAP`] rows.
    pub fn query(&self, filter: &AuditQuery) -> Vec<AuditEvent> {
        let events = self.events.read();
        let mut matched: Vec<AuditEvent> = events
            .iter()
            .filter(|ev| Self::matches(ev, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(AUDIT_QUERY_CAP);
        matched
    }

    /// Events recorded at exactly `at`, oldest first. Mutating operations
    /// stamp every event they append with the request's clock reading, so
    /// this recovers what a single operation just wrote (used by the
    /// Postgres write-through mirror).
    pub fn recorded_at(&self, at: Timestamp) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|ev| ev.created_at == at)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(event: &AuditEvent, filter: &AuditQuery) -> bool {
        if let Some(action) = &filter.action {
            if !event
                .action
                .as_str()
                .to_lowercase()
                .contains(&action.to_lowercase())
            {
                return false;
            }
        }
        if let Some(entity_type) = &filter.entity_type {
            if !event
                .entity_type
                .to_lowercase()
                .contains(&entity_type.to_lowercase())
            {
                return false;
            }
        }
        if let Some(text) = &filter.text {
            let needle = text.to_lowercase();
            let in_summary = event.summary.to_lowercase().contains(&needle);
            let in_entity = event.entity_id.to_lowercase().contains(&needle);
            let in_actor = event
                .actor
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle));
            if !(in_summary || in_entity || in_actor) {
                return false;
            }
        }
        if let Some(from) = filter.from {
            if event.created_at < from {
                return false;
            }
        }
        if let Some(to) = filter.to {
            if event.created_at > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_model::AuditAction;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn event(action: AuditAction, summary: &str, at: &str) -> AuditEvent {
        AuditEvent::new(
            Some("auditor".to_string()),
            action,
            "control",
            "ctl-1",
            summary,
            ts(at),
        )
    }

    #[test]
    fn test_query_newest_first() {
        let log = AuditLog::new();
        log.record(event(AuditAction::EvidenceLinked, "first", "2026-01-01T00:00:00Z"));
        log.record(event(AuditAction::ControlVerified, "second", "2026-01-02T00:00:00Z"));

        let rows = log.query(&AuditQuery::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].summary, "second");
    }

    #[test]
    fn test_action_and_text_filters() {
        let log = AuditLog::new();
        log.record(event(AuditAction::EvidenceLinked, "linked cert", "2026-01-01T00:00:00Z"));
        log.record(event(AuditAction::ControlVerified, "verified", "2026-01-02T00:00:00Z"));

        let by_action = log.query(&AuditQuery {
            action: Some("verified".to_string()),
            ..Default::default()
        });
        assert_eq!(by_action.len(), 1);
        assert_eq!(by_action[0].action, AuditAction::ControlVerified);

        let by_text = log.query(&AuditQuery {
            text: Some("CERT".to_string()),
            ..Default::default()
        });
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].action, AuditAction::EvidenceLinked);
    }

    #[test]
    fn test_time_range_filter() {
        let log = AuditLog::new();
        log.record(event(AuditAction::NoteCreated, "early", "2026-01-01T00:00:00Z"));
        log.record(event(AuditAction::NoteCreated, "late", "2026-03-01T00:00:00Z"));

        let rows = log.query(&AuditQuery {
            from: Some(ts("2026-02-01T00:00:00Z")),
            ..Default::default()
        });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "late");
    }

    #[test]
    fn test_query_capped_at_200() {
        let log = AuditLog::new();
        for _ in 0..250 {
            log.record(event(AuditAction::AlertRaised, "x", "2026-01-01T00:00:00Z"));
        }
        assert_eq!(log.len(), 250);
        assert_eq!(log.query(&AuditQuery::default()).len(), AUDIT_QUERY_CAP);
    }
}
