//! # Evidence Items, Files, and Links
//!
//! An `EvidenceItem` is a discrete piece of proof (document, log,
//! certificate) with an event date and an optional validity window. It is
//! created independently of any control and associated via `EvidenceLink`
//! join records, so one item can support many controls.
//!
//! Items and files are append-only: once uploaded, a file's bytes and
//! metadata never change — the recorded SHA-256 is the basis for integrity
//! checks and dedup. Deleting a link never deletes the item.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use av_core::{ControlId, EvidenceFileId, EvidenceId, LinkId, Timestamp};

/// A discrete piece of compliance proof.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvidenceItem {
    /// Unique evidence identifier.
    pub id: EvidenceId,
    /// Short human-readable title.
    pub title: String,
    /// Category (e.g. `policy`, `certificate`, `training_record`).
    /// Sufficiency rules filter on this.
    pub category: String,
    /// Optional finer-grained subtype.
    pub subtype: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// The date the evidenced event occurred (inspection date, issue date).
    pub event_date: NaiveDate,
    /// Start of the validity window, if bounded.
    pub valid_from: Option<NaiveDate>,
    /// End of the validity window. `None` means no expiry.
    pub valid_until: Option<NaiveDate>,
    /// Actor who created the item.
    pub created_by: Option<String>,
    /// Creation timestamp — the tie-break when event dates collide.
    pub created_at: Timestamp,
}

impl EvidenceItem {
    /// Whether the validity window covers the given date.
    ///
    /// An absent `valid_from` is an open start; an absent `valid_until`
    /// means the item never expires.
    pub fn valid_on(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.valid_from {
            if date < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if date > until {
                return false;
            }
        }
        true
    }
}

/// A file attached to an evidence item. Immutable after upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvidenceFile {
    /// Unique file identifier.
    pub id: EvidenceFileId,
    /// The evidence item this file belongs to.
    pub evidence_item_id: EvidenceId,
    /// Blob store bucket.
    pub bucket: String,
    /// Blob store object key.
    pub object_key: String,
    /// Original filename.
    pub filename: String,
    /// MIME content type.
    pub content_type: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// Lowercase hex SHA-256 of the file bytes.
    pub sha256: String,
    /// Upload timestamp.
    pub uploaded_at: Timestamp,
}

/// Association between an evidence item and a control it supports.
///
/// At most one link may exist per (control, evidence item) pair at a time;
/// the store treats duplicate link requests as idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvidenceLink {
    /// Unique link identifier.
    pub id: LinkId,
    /// The supported control.
    pub control_id: ControlId,
    /// The supporting evidence item.
    pub evidence_item_id: EvidenceId,
    /// Why this evidence is relevant to this control.
    pub relevance_note: Option<String>,
    /// Actor who created the link.
    pub linked_by: Option<String>,
    /// When the link was created. Verification snapshots compare against
    /// the maximum of these per control.
    pub linked_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(valid_from: Option<NaiveDate>, valid_until: Option<NaiveDate>) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId::new(),
            title: "Calibration certificate".to_string(),
            category: "certificate".to_string(),
            subtype: None,
            notes: None,
            event_date: date(2026, 1, 15),
            valid_from,
            valid_until,
            created_by: Some("tech".to_string()),
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_no_window_always_valid() {
        let ev = item(None, None);
        assert!(ev.valid_on(date(2020, 1, 1)));
        assert!(ev.valid_on(date(2030, 12, 31)));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let ev = item(Some(date(2026, 1, 1)), Some(date(2026, 12, 31)));
        assert!(ev.valid_on(date(2026, 1, 1)));
        assert!(ev.valid_on(date(2026, 12, 31)));
        assert!(!ev.valid_on(date(2025, 12, 31)));
        assert!(!ev.valid_on(date(2027, 1, 1)));
    }

    #[test]
    fn test_open_start_with_expiry() {
        let ev = item(None, Some(date(2026, 6, 30)));
        assert!(ev.valid_on(date(2026, 6, 30)));
        assert!(!ev.valid_on(date(2026, 7, 1)));
    }
}
