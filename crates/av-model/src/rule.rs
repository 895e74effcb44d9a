//! # Evidence Sufficiency Rules
//!
//! An `EvidenceRule` is the pluggable predicate that decides when a
//! control's linked evidence is sufficient. Rules are scoped either to one
//! control or to every control in a section of a pack, filter candidate
//! evidence by category/subtype, and come in five kinds covering the
//! recurrence patterns accreditation bodies actually use.
//!
//! Rules are validated at construction: a kind that needs a day count
//! refuses zero or negative values, and `min_items` must be positive. A
//! rule that cannot be evaluated is a configuration defect, not a runtime
//! surprise.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use av_core::{ControlId, PackId, RuleId, Timestamp};

/// What a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "scope_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleScope {
    /// Applies to a single control.
    Control {
        /// The target control.
        control_id: ControlId,
    },
    /// Applies to every control whose section code matches.
    Section {
        /// The target section code (e.g. `ROM`).
        section_code: String,
    },
}

/// The recurrence pattern a rule checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "rule_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// At least `min_items` matching items, ever.
    OneTime,
    /// A matching item within the last `every_days` days; the next one is
    /// due `every_days` after the most recent match.
    Frequency {
        /// Renewal interval in days.
        every_days: i64,
    },
    /// At least `min_items` matching items dated inside the trailing window.
    RollingWindow {
        /// Window length in days.
        window_days: i64,
    },
    /// Alias of `RollingWindow` kept as a distinct kind because imported
    /// rule sets distinguish them; evaluation is identical.
    CountInWindow {
        /// Window length in days.
        window_days: i64,
    },
    /// At least one matching item whose `valid_until` has not passed.
    Expiry,
}

impl RuleKind {
    /// Stable name used in audit summaries and rule listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "ONE_TIME",
            Self::Frequency { .. } => "FREQUENCY",
            Self::RollingWindow { .. } => "ROLLING_WINDOW",
            Self::CountInWindow { .. } => "COUNT_IN_WINDOW",
            Self::Expiry => "EXPIRY",
        }
    }
}

/// Errors from rule construction.
#[derive(Error, Debug)]
pub enum RuleError {
    /// A day-count parameter must be positive.
    #[error("{field} must be > 0 for {kind}")]
    NonPositiveDays {
        /// The offending field name.
        field: &'static str,
        /// The rule kind being validated.
        kind: &'static str,
    },

    /// `min_items` must be positive.
    #[error("min_items must be > 0")]
    NonPositiveMinItems,
}

/// A configured sufficiency rule.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvidenceRule {
    /// Unique rule identifier.
    pub id: RuleId,
    /// The pack this rule belongs to.
    pub pack_id: PackId,
    /// Control or section scope.
    #[serde(flatten)]
    pub scope: RuleScope,
    /// Recurrence pattern.
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Minimum number of matching items required.
    pub min_items: u32,
    /// Whether satisfying this rule additionally requires a fresh human
    /// verification before the control can show VERIFIED.
    pub requires_verification: bool,
    /// Evidence categories this rule accepts. Empty = accept all.
    pub acceptable_categories: Vec<String>,
    /// Evidence subtypes this rule accepts. Empty = accept all.
    pub acceptable_subtypes: Vec<String>,
    /// Disabled rules are ignored by the status engine.
    pub enabled: bool,
    /// Operator notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl EvidenceRule {
    /// Build a validated rule.
    pub fn new(
        pack_id: PackId,
        scope: RuleScope,
        kind: RuleKind,
        min_items: u32,
    ) -> Result<Self, RuleError> {
        let rule = Self {
            id: RuleId::new(),
            pack_id,
            scope,
            kind,
            min_items,
            requires_verification: false,
            acceptable_categories: Vec::new(),
            acceptable_subtypes: Vec::new(),
            enabled: true,
            notes: None,
            created_at: Timestamp::now(),
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Require a fresh verification on top of evidence sufficiency.
    pub fn with_verification(mut self) -> Self {
        self.requires_verification = true;
        self
    }

    /// Restrict accepted evidence categories.
    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.acceptable_categories = categories.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Restrict accepted evidence subtypes.
    pub fn with_subtypes(mut self, subtypes: &[&str]) -> Self {
        self.acceptable_subtypes = subtypes.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Validate parameter consistency.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.min_items == 0 {
            return Err(RuleError::NonPositiveMinItems);
        }
        match &self.kind {
            RuleKind::Frequency { every_days } if *every_days <= 0 => {
                Err(RuleError::NonPositiveDays { field: "every_days", kind: "FREQUENCY" })
            }
            RuleKind::RollingWindow { window_days } if *window_days <= 0 => {
                Err(RuleError::NonPositiveDays { field: "window_days", kind: "ROLLING_WINDOW" })
            }
            RuleKind::CountInWindow { window_days } if *window_days <= 0 => {
                Err(RuleError::NonPositiveDays { field: "window_days", kind: "COUNT_IN_WINDOW" })
            }
            _ => Ok(()),
        }
    }

    /// Whether this rule applies to the given control identity.
    pub fn applies_to(&self, control_id: ControlId, section_code: &str) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.scope {
            RuleScope::Control { control_id: target } => *target == control_id,
            RuleScope::Section { section_code: target } => target == section_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_scope() -> RuleScope {
        RuleScope::Control { control_id: ControlId::new() }
    }

    #[test]
    fn test_one_time_rule_valid() {
        let rule = EvidenceRule::new(PackId::new(), control_scope(), RuleKind::OneTime, 1);
        assert!(rule.is_ok());
    }

    #[test]
    fn test_zero_min_items_rejected() {
        let err = EvidenceRule::new(PackId::new(), control_scope(), RuleKind::OneTime, 0);
        assert!(matches!(err, Err(RuleError::NonPositiveMinItems)));
    }

    #[test]
    fn test_nonpositive_days_rejected() {
        assert!(EvidenceRule::new(
            PackId::new(),
            control_scope(),
            RuleKind::Frequency { every_days: 0 },
            1
        )
        .is_err());
        assert!(EvidenceRule::new(
            PackId::new(),
            control_scope(),
            RuleKind::RollingWindow { window_days: -30 },
            1
        )
        .is_err());
    }

    #[test]
    fn test_applies_to_control_scope() {
        let cid = ControlId::new();
        let rule = EvidenceRule::new(
            PackId::new(),
            RuleScope::Control { control_id: cid },
            RuleKind::OneTime,
            1,
        )
        .unwrap();
        assert!(rule.applies_to(cid, "ROM"));
        assert!(!rule.applies_to(ControlId::new(), "ROM"));
    }

    #[test]
    fn test_applies_to_section_scope() {
        let rule = EvidenceRule::new(
            PackId::new(),
            RuleScope::Section { section_code: "ROM".to_string() },
            RuleKind::Expiry,
            1,
        )
        .unwrap();
        assert!(rule.applies_to(ControlId::new(), "ROM"));
        assert!(!rule.applies_to(ControlId::new(), "HRM"));
    }

    #[test]
    fn test_disabled_rule_never_applies() {
        let cid = ControlId::new();
        let mut rule = EvidenceRule::new(
            PackId::new(),
            RuleScope::Control { control_id: cid },
            RuleKind::OneTime,
            1,
        )
        .unwrap();
        rule.enabled = false;
        assert!(!rule.applies_to(cid, "ROM"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RuleKind::OneTime.as_str(), "ONE_TIME");
        assert_eq!(RuleKind::Frequency { every_days: 365 }.as_str(), "FREQUENCY");
        assert_eq!(RuleKind::Expiry.as_str(), "EXPIRY");
    }
}
