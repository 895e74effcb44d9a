//! # Status Computation
//!
//! Derives a control's [`ControlStatus`] from its evidence rules, linked
//! evidence, verification history, and unresolved corrective actions.
//!
//! ## Design
//!
//! The function is total and deterministic: the evaluation date is a
//! parameter, evidence is re-sorted internally (event_date desc, created_at
//! desc) so caller ordering cannot change the result, and the details
//! payload records every per-rule outcome that fed the decision.
//!
//! Derivation order: no evidence at all is `NOT_STARTED`; any overdue rule
//! wins `OVERDUE` unless the control has been freshly VERIFIED since
//! becoming due; all rules satisfied promotes to `READY`, or `VERIFIED`
//! when the latest decision is VERIFIED and still counts; anything else is
//! `IN_PROGRESS`. An unresolved corrective-action note caps the result at
//! `IN_PROGRESS` regardless of rule outcomes.
//!
//! A decision stops counting when a later decision supersedes it (a
//! rejection always demotes) or, for controls whose rules demand
//! re-verification, when any link mutation postdates its evidence
//! snapshot. Demotion is never silent: the service layer logs and audits
//! every drop out of `VERIFIED`.

use chrono::{Days, NaiveDate};

use av_core::Timestamp;
use av_model::{
    ComputedStatus, Control, ControlStatus, EvidenceItem, EvidenceRule, RuleHint, RuleKind,
    RuleResult, StatusDetails, Verification, VerificationStatus,
};

/// Everything the computation reads. All fields are caller-supplied; the
/// engine performs no lookups of its own.
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs<'a> {
    pub control: &'a Control,
    /// All rules of the control's pack. Scope and enabled filtering happens
    /// inside the engine.
    pub rules: &'a [EvidenceRule],
    /// Evidence items currently linked to the control.
    pub evidence: &'a [EvidenceItem],
    /// Most recent link mutation instant, `None` when the control has never
    /// had a link.
    pub latest_linked_at: Option<Timestamp>,
    /// Full verification history for the control.
    pub verifications: &'a [Verification],
    /// Count of unresolved CORRECTIVE_ACTION notes.
    pub open_corrective_actions: usize,
}

fn matches_filters(rule: &EvidenceRule, item: &EvidenceItem) -> bool {
    if !rule.acceptable_categories.is_empty()
        && !rule.acceptable_categories.contains(&item.category)
    {
        return false;
    }
    if !rule.acceptable_subtypes.is_empty() {
        match &item.subtype {
            Some(st) if rule.acceptable_subtypes.contains(st) => {}
            _ => return false,
        }
    }
    true
}

fn plus_days(date: NaiveDate, days: i64) -> NaiveDate {
    // Rule validation bounds day counts to positive values well below the
    // chrono date range, so saturation never fires in practice.
    date.checked_add_days(Days::new(days.max(0) as u64))
        .unwrap_or(NaiveDate::MAX)
}

/// Evaluate one rule against the control's linked evidence.
pub fn evaluate_rule(rule: &EvidenceRule, evidence: &[EvidenceItem], today: NaiveDate) -> RuleResult {
    let matched: Vec<&EvidenceItem> =
        evidence.iter().filter(|ev| matches_filters(rule, ev)).collect();
    let matched_count = matched.len();
    let last_match_date = matched.iter().map(|ev| ev.event_date).max();

    let mut result = RuleResult {
        rule_id: rule.id,
        satisfied: false,
        status_hint: RuleHint::Missing,
        due_date: None,
        matched_count,
        last_match_date,
    };

    match rule.kind {
        RuleKind::OneTime => {
            result.satisfied = matched_count >= rule.min_items as usize;
            result.status_hint = if result.satisfied { RuleHint::Ok } else { RuleHint::Missing };
        }
        RuleKind::Frequency { every_days } => {
            let Some(last) = last_match_date else {
                result.status_hint = RuleHint::Overdue;
                return result;
            };
            let due = plus_days(last, every_days);
            result.due_date = Some(due);
            result.satisfied = due >= today;
            result.status_hint = if result.satisfied { RuleHint::Ok } else { RuleHint::Overdue };
        }
        RuleKind::RollingWindow { window_days } | RuleKind::CountInWindow { window_days } => {
            let window_start = today
                .checked_sub_days(Days::new(window_days.max(0) as u64))
                .unwrap_or(NaiveDate::MIN);
            let count_in_window =
                matched.iter().filter(|ev| ev.event_date >= window_start).count();
            let required = (rule.min_items as usize).max(1);

            result.matched_count = count_in_window;
            result.due_date = last_match_date.map(|d| plus_days(d, window_days));
            result.satisfied = count_in_window >= required;
            result.status_hint = if result.satisfied { RuleHint::Ok } else { RuleHint::Overdue };
        }
        RuleKind::Expiry => {
            let valid: Vec<&EvidenceItem> = matched
                .iter()
                .copied()
                .filter(|ev| ev.valid_until.is_some_and(|until| until >= today))
                .collect();
            result.matched_count = valid.len();
            result.satisfied = !valid.is_empty();
            // Next due is the earliest expiry among still-valid items.
            result.due_date = valid.iter().filter_map(|ev| ev.valid_until).min();
            result.last_match_date = valid.iter().map(|ev| ev.event_date).max();
            result.status_hint = if result.satisfied { RuleHint::Ok } else { RuleHint::Overdue };
        }
    }
    result
}

/// The most recent decision of any outcome. A later REJECTED record
/// supersedes an earlier VERIFIED one; filtering to VERIFIED here would
/// make rejections invisible.
fn latest_decision(verifications: &[Verification]) -> Option<&Verification> {
    verifications
        .iter()
        .max_by_key(|v| (v.verified_at, *v.id.as_uuid()))
}

/// Compute the control's status as of `today`, stamped `computed_at = now`.
pub fn compute_status(inputs: &StatusInputs<'_>, today: NaiveDate, now: Timestamp) -> ControlStatus {
    let section_code = inputs.control.section_code().to_string();

    let applicable: Vec<&EvidenceRule> = inputs
        .rules
        .iter()
        .filter(|r| r.applies_to(inputs.control.id, &section_code))
        .collect();

    // Deterministic evidence order regardless of caller ordering.
    let mut evidence: Vec<&EvidenceItem> = inputs.evidence.iter().collect();
    evidence.sort_by(|a, b| {
        b.event_date
            .cmp(&a.event_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    let owned: Vec<EvidenceItem> = evidence.iter().map(|ev| (*ev).clone()).collect();

    let last_evidence_date = owned.iter().map(|ev| ev.event_date).max();

    let rule_results: Vec<RuleResult> =
        applicable.iter().map(|r| evaluate_rule(r, &owned, today)).collect();

    let latest = latest_decision(inputs.verifications);
    // `requires_verification` is the invalidation policy: a strict rule
    // means any link mutation after the snapshot voids the decision; a
    // plain rule keeps a VERIFIED decision until a later decision
    // supersedes it.
    let strict = applicable.iter().any(|r| r.requires_verification);
    let verification_fresh = latest.is_some_and(|v| {
        v.status == VerificationStatus::Verified
            && (!strict || v.is_fresh(inputs.latest_linked_at))
    });

    let is_overdue = |rr: &RuleResult| {
        rr.status_hint == RuleHint::Overdue
            || (!rr.satisfied && rr.due_date.is_some_and(|d| d < today))
    };

    let mut computed_status = if owned.is_empty() {
        ComputedStatus::NotStarted
    } else {
        let any_overdue = rule_results.iter().any(|rr| is_overdue(rr));
        let all_satisfied =
            !rule_results.is_empty() && rule_results.iter().all(|rr| rr.satisfied);

        if any_overdue {
            // A counting VERIFIED decision made on or after every overdue
            // due date lifts the overdue override; the next decision or
            // due date passing restores it.
            let verified_since_due = verification_fresh
                && latest.is_some_and(|v| {
                    let decided = v.verified_at.date();
                    rule_results
                        .iter()
                        .filter(|rr| is_overdue(rr))
                        .all(|rr| rr.due_date.map_or(true, |d| decided >= d))
                });
            if verified_since_due {
                ComputedStatus::Verified
            } else {
                ComputedStatus::Overdue
            }
        } else if all_satisfied {
            if verification_fresh {
                ComputedStatus::Verified
            } else {
                ComputedStatus::Ready
            }
        } else {
            ComputedStatus::InProgress
        }
    };

    // Unresolved corrective actions block promotion past IN_PROGRESS.
    if inputs.open_corrective_actions > 0
        && matches!(computed_status, ComputedStatus::Ready | ComputedStatus::Verified)
    {
        computed_status = ComputedStatus::InProgress;
    }

    let next_due_date = rule_results.iter().filter_map(|rr| rr.due_date).min();

    ControlStatus {
        control_id: inputs.control.id,
        computed_status,
        last_evidence_date,
        next_due_date,
        computed_at: now,
        details: StatusDetails {
            section_code,
            rule_results,
            latest_decision_at: latest.map(|v| v.verified_at),
            verification_fresh,
        },
    }
}
