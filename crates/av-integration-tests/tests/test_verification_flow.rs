//! Verification freshness and demotion: a VERIFIED control drops back when
//! a later rejection supersedes the decision or, under a re-verification
//! rule, when the evidence set changes; demotions are audited, and a fresh
//! decision lifts an overdue override and clears its alert.

mod common;

use common::*;

use av_core::AvError;
use av_model::{ComputedStatus, VerificationStatus};
use av_store::AuditQuery;

#[test]
fn test_verify_promotes_and_new_link_demotes() {
    let svc = service();
    let control = seed_control(&svc);
    verified_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();

    // Sufficient but unverified.
    assert_eq!(
        svc.get_status(control.id, t0).unwrap().computed_status,
        ComputedStatus::Ready
    );

    let t1 = ts("2026-06-02T00:00:00Z");
    let verification = svc.verify(control.id, "assessor", None, t1).unwrap();
    assert_eq!(verification.status, VerificationStatus::Verified);
    assert_eq!(
        svc.get_status(control.id, t1).unwrap().computed_status,
        ComputedStatus::Verified
    );

    // Linking more evidence invalidates the decision.
    let t2 = ts("2026-06-03T00:00:00Z");
    let newer = svc.create_evidence(draft("Newer cert", "2026-06-01"), "staff", t2).unwrap();
    svc.link_evidence(control.id, newer.id, None, "staff", t2).unwrap();

    let status = svc.get_status(control.id, t2).unwrap();
    assert_eq!(status.computed_status, ComputedStatus::Ready);
    assert!(!status.details.verification_fresh);

    // The demotion is explicit in the audit trail.
    let demotions = svc.audit().query(&AuditQuery {
        action: Some("status_demoted".to_string()),
        ..Default::default()
    });
    assert_eq!(demotions.len(), 1);
}

#[test]
fn test_reverify_restores_verified() {
    let svc = service();
    let control = seed_control(&svc);
    verified_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();
    svc.verify(control.id, "assessor", None, ts("2026-06-02T00:00:00Z")).unwrap();

    let t2 = ts("2026-06-03T00:00:00Z");
    let newer = svc.create_evidence(draft("Newer", "2026-06-01"), "staff", t2).unwrap();
    svc.link_evidence(control.id, newer.id, None, "staff", t2).unwrap();

    let t3 = ts("2026-06-04T00:00:00Z");
    svc.verify(control.id, "assessor", Some("re-checked".to_string()), t3).unwrap();
    assert_eq!(
        svc.get_status(control.id, t3).unwrap().computed_status,
        ComputedStatus::Verified
    );
}

#[test]
fn test_rejection_requires_comment_and_never_promotes() {
    let svc = service();
    let control = seed_control(&svc);
    verified_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();

    assert!(matches!(
        svc.reject(control.id, "assessor", None, t0),
        Err(AvError::Validation(_))
    ));

    let rejection = svc
        .reject(control.id, "assessor", Some("photos too dark".to_string()), t0)
        .unwrap();
    assert_eq!(rejection.status, VerificationStatus::Rejected);

    // A rejection is not a fresh VERIFIED decision.
    assert_eq!(
        svc.get_status(control.id, t0).unwrap().computed_status,
        ComputedStatus::Ready
    );
}

#[test]
fn test_later_rejection_demotes_verified() {
    let svc = service();
    let control = seed_control(&svc);
    one_time_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();

    let t1 = ts("2026-06-02T00:00:00Z");
    svc.verify(control.id, "assessor", None, t1).unwrap();
    assert_eq!(
        svc.get_status(control.id, t1).unwrap().computed_status,
        ComputedStatus::Verified
    );

    // A later rejection supersedes the decision and demotes, audited.
    let t2 = ts("2026-06-03T00:00:00Z");
    svc.reject(control.id, "assessor", Some("stale photos".to_string()), t2)
        .unwrap();

    let status = svc.get_status(control.id, t2).unwrap();
    assert_eq!(status.computed_status, ComputedStatus::Ready);

    let demotions = svc.audit().query(&AuditQuery {
        action: Some("status_demoted".to_string()),
        ..Default::default()
    });
    assert_eq!(demotions.len(), 1);
}

#[test]
fn test_verify_clears_overdue_alert() {
    let svc = service();
    let control = seed_control(&svc);
    let rule = av_model::EvidenceRule::new(
        control.pack_id,
        av_model::RuleScope::Control {
            control_id: control.id,
        },
        av_model::RuleKind::Frequency { every_days: 30 },
        1,
    )
    .unwrap();
    svc.insert_rule(rule).unwrap();

    // Evidence far past its renewal period: OVERDUE with an open alert.
    let t0 = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Old cert", "2026-01-15"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();
    assert_eq!(
        svc.get_status(control.id, t0).unwrap().computed_status,
        ComputedStatus::Overdue
    );
    assert_eq!(svc.registry().open_alerts_for_control(control.id).len(), 1);

    // A decision made after the control fell due lifts the override and
    // reconciliation clears the alert.
    let t1 = ts("2026-06-02T00:00:00Z");
    svc.verify(control.id, "assessor", Some("accepted on site".to_string()), t1)
        .unwrap();

    let status = svc.get_status(control.id, t1).unwrap();
    assert_eq!(status.computed_status, ComputedStatus::Verified);
    assert!(svc.registry().open_alerts_for_control(control.id).is_empty());

    // Rejecting afterwards restores the overdue state and its alert.
    let t2 = ts("2026-06-03T00:00:00Z");
    svc.reject(control.id, "assessor", Some("not acceptable after all".to_string()), t2)
        .unwrap();
    assert_eq!(
        svc.get_status(control.id, t2).unwrap().computed_status,
        ComputedStatus::Overdue
    );
    assert_eq!(svc.registry().open_alerts_for_control(control.id).len(), 1);
}

#[test]
fn test_concurrent_decision_conflicts() {
    let svc = service();
    let control = seed_control(&svc);
    verified_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();

    // Simulate a decision in flight by holding the control's lock.
    let handle = svc.locks().handle(control.id);
    let _guard = handle.lock();

    let result = svc.verify(control.id, "assessor", None, t0);
    assert!(matches!(result, Err(AvError::Conflict(_))));

    drop(_guard);
    assert!(svc.verify(control.id, "assessor", None, t0).is_ok());
}
