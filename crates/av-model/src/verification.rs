//! # Verification Decisions
//!
//! A verification is an immutable record of a human decision over a
//! control's evidence set. Decisions are never edited or deleted; a later
//! decision supersedes an earlier one, and freshness is determined by
//! comparing the decision's evidence snapshot instant against the most
//! recent link mutation.
//!
//! ## Security Invariant
//!
//! `evidence_snapshot_at` is captured inside the control's write lock at
//! decision time. A VERIFIED decision covers the evidence set only while no
//! link mutation postdates it; the status engine demotes on staleness
//! rather than trusting the stored outcome.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use av_core::{ControlId, Timestamp, VerificationId};

/// The outcome of a verification decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable verification decision over a control's evidence set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Verification {
    pub id: VerificationId,
    pub control_id: ControlId,
    /// VERIFIED or REJECTED.
    pub status: VerificationStatus,
    /// Who made the decision.
    pub verified_by: String,
    /// When the decision was made.
    pub verified_at: Timestamp,
    /// Instant at which the evidence set was observed for this decision.
    /// `None` only on records migrated from before snapshotting existed;
    /// such decisions are never considered fresh.
    pub evidence_snapshot_at: Option<Timestamp>,
    /// Free-text rationale. Required for rejections.
    pub comment: String,
}

impl Verification {
    /// Whether this decision still covers an evidence set last mutated at
    /// `latest_linked_at`.
    ///
    /// A decision with no snapshot is never fresh. A control with no link
    /// mutations at all leaves any snapshotted decision fresh.
    pub fn is_fresh(&self, latest_linked_at: Option<Timestamp>) -> bool {
        match (self.evidence_snapshot_at, latest_linked_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(snap), Some(linked)) => snap >= linked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(snapshot: Option<&str>) -> Verification {
        Verification {
            id: VerificationId::new(),
            control_id: ControlId::new(),
            status: VerificationStatus::Verified,
            verified_by: "inspector".to_string(),
            verified_at: Timestamp::parse("2026-03-01T12:00:00Z").unwrap(),
            evidence_snapshot_at: snapshot.map(|s| Timestamp::parse(s).unwrap()),
            comment: "reviewed".to_string(),
        }
    }

    #[test]
    fn test_fresh_when_snapshot_at_or_after_latest_link() {
        let v = decision(Some("2026-03-01T12:00:00Z"));
        let earlier = Timestamp::parse("2026-02-01T00:00:00Z").unwrap();
        assert!(v.is_fresh(Some(earlier)));
        // Exact tie counts as covering.
        let tie = Timestamp::parse("2026-03-01T12:00:00Z").unwrap();
        assert!(v.is_fresh(Some(tie)));
    }

    #[test]
    fn test_stale_when_link_mutation_postdates_snapshot() {
        let v = decision(Some("2026-03-01T12:00:00Z"));
        let later = Timestamp::parse("2026-03-02T00:00:00Z").unwrap();
        assert!(!v.is_fresh(Some(later)));
    }

    #[test]
    fn test_missing_snapshot_is_never_fresh() {
        let v = decision(None);
        assert!(!v.is_fresh(None));
        let any = Timestamp::parse("2020-01-01T00:00:00Z").unwrap();
        assert!(!v.is_fresh(Some(any)));
    }

    #[test]
    fn test_no_link_mutations_leaves_snapshot_fresh() {
        let v = decision(Some("2026-03-01T12:00:00Z"));
        assert!(v.is_fresh(None));
    }
}
