//! # Alert Reconciliation
//!
//! Pure diff between a freshly computed control status and the alerts
//! currently open for that control. The caller applies the returned delta:
//! raised alerts are inserted, cleared alerts overwrite their open
//! predecessors. Running the same reconciliation twice produces an empty
//! delta the second time.

use chrono::Days;

use av_core::Timestamp;
use av_model::{AlertType, ComplianceAlert, ComputedStatus, ControlStatus};

/// Default NEAR_DUE lookahead window in days.
pub const DEFAULT_LOOKAHEAD_DAYS: u64 = 30;

/// The changes reconciliation decided on. Both lists may be empty.
#[derive(Debug, Clone, Default)]
pub struct AlertDelta {
    pub raised: Vec<ComplianceAlert>,
    pub cleared: Vec<ComplianceAlert>,
}

impl AlertDelta {
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty() && self.cleared.is_empty()
    }
}

fn implied(status: &ControlStatus, alert_type: AlertType, now: Timestamp, lookahead_days: u64) -> bool {
    match alert_type {
        AlertType::Overdue => status.computed_status == ComputedStatus::Overdue,
        AlertType::NearDue => {
            if status.computed_status == ComputedStatus::Overdue {
                return false;
            }
            let Some(due) = status.next_due_date else {
                return false;
            };
            let today = now.date();
            let horizon = today
                .checked_add_days(Days::new(lookahead_days))
                .unwrap_or(chrono::NaiveDate::MAX);
            due >= today && due <= horizon
        }
    }
}

fn message(status: &ControlStatus, alert_type: AlertType) -> String {
    match (alert_type, status.next_due_date) {
        (AlertType::Overdue, Some(due)) => format!("control is overdue, was due {due}"),
        (AlertType::Overdue, None) => "control is overdue".to_string(),
        (AlertType::NearDue, Some(due)) => format!("control is due {due}"),
        (AlertType::NearDue, None) => "control is approaching its due date".to_string(),
    }
}

/// Decide which alerts to raise and which to clear for one control.
///
/// `open_alerts` must be the control's currently open (uncleared) alerts.
/// Cleared entries in the delta are copies with `cleared_at` set; the
/// caller persists them over the originals.
pub fn reconcile(
    status: &ControlStatus,
    open_alerts: &[ComplianceAlert],
    now: Timestamp,
    lookahead_days: u64,
) -> AlertDelta {
    let mut delta = AlertDelta::default();

    for alert_type in [AlertType::Overdue, AlertType::NearDue] {
        let wanted = implied(status, alert_type, now, lookahead_days);
        let open = open_alerts
            .iter()
            .find(|a| a.alert_type == alert_type && a.is_open());

        match (wanted, open) {
            (true, None) => {
                delta.raised.push(ComplianceAlert::raise(
                    status.control_id,
                    alert_type,
                    message(status, alert_type),
                    now,
                ));
            }
            (false, Some(existing)) => {
                let mut cleared = existing.clone();
                cleared.clear(now);
                delta.cleared.push(cleared);
            }
            _ => {}
        }
    }
    delta
}
