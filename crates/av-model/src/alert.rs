//! # Compliance Alerts
//!
//! Alerts are derived flags raised when a control goes OVERDUE or
//! approaches a due date. Reconciliation is idempotent: an open alert of
//! the same type on the same control is reused, never duplicated, and
//! alerts whose condition has lapsed are closed with a `cleared_at`
//! timestamp rather than deleted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use av_core::{AlertId, ControlId, Timestamp};

/// Why an alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// The control's computed status is OVERDUE.
    Overdue,
    /// A due date falls within the lookahead window.
    NearDue,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "OVERDUE",
            Self::NearDue => "NEAR_DUE",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised (and possibly later cleared) compliance alert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComplianceAlert {
    pub id: AlertId,
    pub control_id: ControlId,
    pub alert_type: AlertType,
    /// Human-readable condition summary.
    pub message: String,
    pub triggered_at: Timestamp,
    /// Set when the condition lapses. Cleared alerts stay queryable.
    pub cleared_at: Option<Timestamp>,
}

impl ComplianceAlert {
    pub fn raise(
        control_id: ControlId,
        alert_type: AlertType,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: AlertId::new(),
            control_id,
            alert_type,
            message: message.into(),
            triggered_at: now,
            cleared_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.cleared_at.is_none()
    }

    /// Close the alert. Idempotent: a second clear keeps the first instant.
    pub fn clear(&mut self, now: Timestamp) {
        if self.cleared_at.is_none() {
            self.cleared_at = Some(now);
        }
    }
}
