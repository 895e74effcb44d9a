//! # Computed Control Status
//!
//! `ControlStatus` is the cached, always-rederivable compliance state of a
//! control. It is a value computed by `av-engine` from source records
//! (links, rules, verifications, time) — never hand-edited, safe to delete
//! and rebuild. The `details` payload records the inputs that produced the
//! result so an auditor can see *why* a control shows what it shows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use av_core::{ControlId, RuleId, Timestamp};

/// The derivable compliance state of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputedStatus {
    /// No evidence linked at all.
    NotStarted,
    /// Some evidence, but sufficiency criteria not yet met.
    InProgress,
    /// Evidence sufficient; awaiting (or not requiring fresh) verification.
    Ready,
    /// Evidence sufficient and covered by a fresh VERIFIED decision.
    Verified,
    /// At least one sufficiency rule is past due.
    Overdue,
}

impl ComputedStatus {
    /// Stable display name (`NOT_STARTED`, `IN_PROGRESS`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Verified => "VERIFIED",
            Self::Overdue => "OVERDUE",
        }
    }

    /// All statuses, in dashboard display order.
    pub const ALL: [ComputedStatus; 5] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Ready,
        Self::Verified,
        Self::Overdue,
    ];
}

impl std::fmt::Display for ComputedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-rule evaluation hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleHint {
    /// Rule satisfied.
    Ok,
    /// Not enough matching evidence yet.
    Missing,
    /// The rule's due date has passed.
    Overdue,
}

/// The outcome of evaluating one rule against the linked evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RuleResult {
    /// The evaluated rule.
    pub rule_id: RuleId,
    /// Whether the rule is satisfied.
    pub satisfied: bool,
    /// Coarse hint for dashboards.
    pub status_hint: RuleHint,
    /// When the rule next falls due, if it has a recurrence.
    pub due_date: Option<NaiveDate>,
    /// Number of evidence items that matched the rule's filters
    /// (window-restricted for windowed kinds).
    pub matched_count: usize,
    /// Event date of the most recent matching item.
    pub last_match_date: Option<NaiveDate>,
}

/// Explainability payload stored alongside the computed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusDetails {
    /// Section code the control resolved to.
    pub section_code: String,
    /// Per-rule evaluation outcomes.
    pub rule_results: Vec<RuleResult>,
    /// Timestamp of the latest verification decision of either outcome.
    pub latest_decision_at: Option<Timestamp>,
    /// Whether the latest decision is VERIFIED and still counts toward
    /// the computed status.
    pub verification_fresh: bool,
}

/// Cached computed status for one control.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ControlStatus {
    /// The control this status belongs to.
    pub control_id: ControlId,
    /// The derived compliance state.
    pub computed_status: ComputedStatus,
    /// Max `event_date` across currently linked evidence.
    pub last_evidence_date: Option<NaiveDate>,
    /// Earliest upcoming due date across applicable rules.
    pub next_due_date: Option<NaiveDate>,
    /// When this cache entry was computed.
    pub computed_at: Timestamp,
    /// Inputs used, for explainability.
    pub details: StatusDetails,
}

impl ControlStatus {
    /// Equality of the derived fields, ignoring `computed_at`.
    ///
    /// Recomputation idempotence is defined on this: identical inputs must
    /// yield inputs-equal statuses even though the computation instant moved.
    pub fn inputs_eq(&self, other: &ControlStatus) -> bool {
        self.control_id == other.control_id
            && self.computed_status == other.computed_status
            && self.last_evidence_date == other.last_evidence_date
            && self.next_due_date == other.next_due_date
            && self.details == other.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(ComputedStatus::NotStarted.to_string(), "NOT_STARTED");
        assert_eq!(ComputedStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(ComputedStatus::Ready.to_string(), "READY");
        assert_eq!(ComputedStatus::Verified.to_string(), "VERIFIED");
        assert_eq!(ComputedStatus::Overdue.to_string(), "OVERDUE");
    }

    #[test]
    fn test_status_serde_wire_format() {
        let json = serde_json::to_string(&ComputedStatus::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
        let parsed: ComputedStatus = serde_json::from_str("\"OVERDUE\"").unwrap();
        assert_eq!(parsed, ComputedStatus::Overdue);
    }

    #[test]
    fn test_inputs_eq_ignores_computed_at() {
        let details = StatusDetails {
            section_code: "ROM".to_string(),
            rule_results: vec![],
            latest_decision_at: None,
            verification_fresh: false,
        };
        let a = ControlStatus {
            control_id: ControlId::new(),
            computed_status: ComputedStatus::Ready,
            last_evidence_date: None,
            next_due_date: None,
            computed_at: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
            details: details.clone(),
        };
        let mut b = a.clone();
        b.computed_at = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        assert!(a.inputs_eq(&b));

        b.computed_status = ComputedStatus::Overdue;
        assert!(!a.inputs_eq(&b));
    }
}
