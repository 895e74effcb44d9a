//! # Standard Packs and Controls
//!
//! A `StandardPack` is one published version of an accreditation checklist
//! (e.g. a lab licensing checklist v1.0). It owns `Control`s — the individual
//! checklist requirements. Packs move draft → published → archived; controls
//! are immutable once their pack is published, so the evidence attached to a
//! control always refers to a fixed requirement text.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use av_core::{ControlId, PackId, Timestamp};

/// Section code used when a control code does not follow `AAA-SSS-NNN`.
pub const UNKNOWN_SECTION: &str = "UNK";

/// Lifecycle status of a standard pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    /// Being assembled; controls may still change.
    Draft,
    /// Frozen; controls are immutable.
    Published,
    /// Superseded by a newer version.
    Archived,
}

impl std::fmt::Display for PackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// Errors from pack lifecycle transitions.
#[derive(Error, Debug)]
pub enum PackError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid pack transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Attempted target status.
        to: String,
    },
}

/// One version of a standard checklist. Immutable after publishing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StandardPack {
    /// Unique pack identifier.
    pub id: PackId,
    /// Issuing authority code (e.g. `PHC`).
    pub authority_code: String,
    /// Human-readable name.
    pub name: String,
    /// Version string (e.g. `1.0`).
    pub version: String,
    /// Lifecycle status.
    pub status: PackStatus,
    /// SHA-256 of the source file the pack was imported from.
    pub checksum: String,
    /// When the pack was published, if it has been.
    pub published_at: Option<Timestamp>,
    /// When the pack record was created.
    pub created_at: Timestamp,
}

impl StandardPack {
    /// Create a new draft pack.
    pub fn new(authority_code: &str, name: &str, version: &str, checksum: &str) -> Self {
        Self {
            id: PackId::new(),
            authority_code: authority_code.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            status: PackStatus::Draft,
            checksum: checksum.to_string(),
            published_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Publish the pack (DRAFT → PUBLISHED). Freezes its controls.
    pub fn publish(&mut self, now: Timestamp) -> Result<(), PackError> {
        match self.status {
            PackStatus::Draft => {
                self.status = PackStatus::Published;
                self.published_at = Some(now);
                Ok(())
            }
            other => Err(PackError::InvalidTransition {
                from: other.to_string(),
                to: PackStatus::Published.to_string(),
            }),
        }
    }

    /// Archive the pack (PUBLISHED → ARCHIVED).
    pub fn archive(&mut self) -> Result<(), PackError> {
        match self.status {
            PackStatus::Published => {
                self.status = PackStatus::Archived;
                Ok(())
            }
            other => Err(PackError::InvalidTransition {
                from: other.to_string(),
                to: PackStatus::Archived.to_string(),
            }),
        }
    }

    /// Whether controls in this pack may still be edited.
    pub fn is_mutable(&self) -> bool {
        self.status == PackStatus::Draft
    }
}

/// A single checklist requirement within a standard pack.
///
/// Identity fields (`control_code`, `section`, `standard`, `indicator`,
/// `sort_order`) are immutable once the owning pack is published;
/// enforcement happens in the store, which refuses edits against a
/// published pack.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Control {
    /// Unique control identifier.
    pub id: ControlId,
    /// The pack this control belongs to.
    pub pack_id: PackId,
    /// Control code, conventionally `AAA-SSS-NNN` (authority-section-number).
    pub control_code: String,
    /// Section name.
    pub section: String,
    /// Standard description text.
    pub standard: String,
    /// Indicator/requirement text.
    pub indicator: String,
    /// Global sort order within the pack.
    pub sort_order: i32,
    /// Inactive controls are excluded from sweeps and exports.
    pub active: bool,
    /// When the control record was created.
    pub created_at: Timestamp,
}

impl Control {
    /// The section code embedded in the control code.
    ///
    /// `PHC-ROM-001` → `ROM`. Codes that do not split into exactly three
    /// non-empty segments yield [`UNKNOWN_SECTION`]. Section-scoped evidence
    /// rules match on this value.
    pub fn section_code(&self) -> &str {
        section_code_of(&self.control_code)
    }
}

/// Extract the section code from a control code string.
pub fn section_code_of(control_code: &str) -> &str {
    let mut parts = control_code.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c), None) if !a.is_empty() && !b.is_empty() && !c.is_empty() => b,
        _ => UNKNOWN_SECTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pack() -> StandardPack {
        StandardPack::new("PHC", "Lab Licensing Checklist", "1.0", "abc123")
    }

    #[test]
    fn test_new_pack_is_draft() {
        let pack = make_pack();
        assert_eq!(pack.status, PackStatus::Draft);
        assert!(pack.is_mutable());
        assert!(pack.published_at.is_none());
    }

    #[test]
    fn test_publish_sets_timestamp() {
        let mut pack = make_pack();
        let now = Timestamp::parse("2026-01-10T00:00:00Z").unwrap();
        pack.publish(now).unwrap();
        assert_eq!(pack.status, PackStatus::Published);
        assert_eq!(pack.published_at, Some(now));
        assert!(!pack.is_mutable());
    }

    #[test]
    fn test_publish_twice_rejected() {
        let mut pack = make_pack();
        pack.publish(Timestamp::now()).unwrap();
        assert!(pack.publish(Timestamp::now()).is_err());
    }

    #[test]
    fn test_archive_requires_published() {
        let mut pack = make_pack();
        assert!(pack.archive().is_err());
        pack.publish(Timestamp::now()).unwrap();
        pack.archive().unwrap();
        assert_eq!(pack.status, PackStatus::Archived);
    }

    #[test]
    fn test_section_code_extraction() {
        assert_eq!(section_code_of("PHC-ROM-001"), "ROM");
        assert_eq!(section_code_of("PHC-HRM-042"), "HRM");
    }

    #[test]
    fn test_section_code_malformed() {
        assert_eq!(section_code_of(""), UNKNOWN_SECTION);
        assert_eq!(section_code_of("PHC"), UNKNOWN_SECTION);
        assert_eq!(section_code_of("PHC-ROM"), UNKNOWN_SECTION);
        assert_eq!(section_code_of("PHC-ROM-001-EXTRA"), UNKNOWN_SECTION);
        assert_eq!(section_code_of("PHC--001"), UNKNOWN_SECTION);
    }
}
