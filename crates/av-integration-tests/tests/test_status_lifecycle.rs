//! Status lifecycle across the service: from empty control to READY and
//! back, with deterministic recomputation along the way.

mod common;

use common::*;

use av_model::ComputedStatus;

#[test]
fn test_control_without_evidence_is_not_started() {
    let svc = service();
    let control = seed_control(&svc);
    one_time_rule(&svc, control.pack_id, control.id);

    let now = ts("2026-06-01T00:00:00Z");
    let status = svc.get_status(control.id, now).unwrap();
    assert_eq!(status.computed_status, ComputedStatus::NotStarted);
    assert!(status.last_evidence_date.is_none());
    assert!(status.next_due_date.is_none());
}

#[test]
fn test_recompute_is_idempotent_on_unchanged_inputs() {
    let svc = service();
    let control = seed_control(&svc);
    one_time_rule(&svc, control.pack_id, control.id);

    let item = svc
        .create_evidence(draft("Cert", "2026-05-01"), "staff", ts("2026-05-01T08:00:00Z"))
        .unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", ts("2026-05-01T09:00:00Z"))
        .unwrap();

    let first = svc.recompute(control.id, ts("2026-06-01T00:00:00Z")).unwrap();
    let second = svc.recompute(control.id, ts("2026-06-01T12:00:00Z")).unwrap();
    // Same calendar day, untouched inputs: only computed_at differs.
    assert!(first.inputs_eq(&second));
}

#[test]
fn test_link_then_unlink_round_trip() {
    let svc = service();
    let control = seed_control(&svc);
    one_time_rule(&svc, control.pack_id, control.id);

    let now = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", now).unwrap();
    let (link, created) = svc
        .link_evidence(control.id, item.id, None, "staff", now)
        .unwrap();
    assert!(created);
    assert_eq!(
        svc.get_status(control.id, now).unwrap().computed_status,
        ComputedStatus::Ready
    );

    svc.unlink_evidence(control.id, link.id, "staff", now).unwrap();
    assert_eq!(
        svc.get_status(control.id, now).unwrap().computed_status,
        ComputedStatus::NotStarted
    );
}

#[test]
fn test_section_scoped_rule_covers_new_controls() {
    let svc = service();
    let first = seed_control_coded(&svc, "PHC-ROM-001", 1);
    let rule = av_model::EvidenceRule::new(
        first.pack_id,
        av_model::RuleScope::Section {
            section_code: "ROM".to_string(),
        },
        av_model::RuleKind::OneTime,
        1,
    )
    .unwrap();
    svc.insert_rule(rule).unwrap();

    // A second control in the same section picks up the rule without any
    // per-control configuration.
    let second = seed_control_coded(&svc, "PHC-ROM-002", 2);
    let now = ts("2026-06-01T00:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", now).unwrap();
    svc.link_evidence(second.id, item.id, None, "staff", now).unwrap();

    let status = svc.get_status(second.id, now).unwrap();
    assert_eq!(status.computed_status, ComputedStatus::Ready);
    assert_eq!(status.details.rule_results.len(), 1);
}

#[test]
fn test_overdue_frequency_rule_raises_alert() {
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

    let now = ts("2026-06-01T00:00:00Z");
    let item = svc
        .create_evidence(draft("Old cert", "2026-01-15"), "staff", now)
        .unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", now).unwrap();

    let status = svc.get_status(control.id, now).unwrap();
    assert_eq!(status.computed_status, ComputedStatus::Overdue);

    let open = svc.registry().open_alerts_for_control(control.id);
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].alert_type, av_model::AlertType::Overdue);
}
