//! Cross-crate invariants that no single crate can check on its own.

mod common;

use common::*;

use av_core::{sha256_digest, AvError, CanonicalBytes};
use av_export::DownloadHandle;
use av_model::{Control, EvidenceRule, RuleError, RuleKind, RuleScope};
use serde_json::json;

#[test]
fn test_published_pack_freezes_controls() {
    let svc = service();
    let control = seed_control(&svc);

    let mut pack = svc.registry().packs.get(control.pack_id.as_uuid()).unwrap();
    pack.publish(ts("2026-02-01T00:00:00Z")).unwrap();
    svc.insert_pack(pack.clone());

    let late = Control {
        id: av_core::ControlId::new(),
        pack_id: control.pack_id,
        control_code: "PHC-ROM-002".to_string(),
        section: "Rooms".to_string(),
        standard: "Hygiene".to_string(),
        indicator: "Ventilation check".to_string(),
        sort_order: 2,
        active: true,
        created_at: ts("2026-02-02T00:00:00Z"),
    };
    let err = svc.insert_control(late).unwrap_err();
    assert!(matches!(err, AvError::Conflict(_)));

    // Publishing twice is itself an invalid transition.
    assert!(pack.publish(ts("2026-02-03T00:00:00Z")).is_err());
}

#[test]
fn test_rule_construction_rejects_degenerate_parameters() {
    let svc = service();
    let control = seed_control(&svc);
    let scope = RuleScope::Control {
        control_id: control.id,
    };

    let err = EvidenceRule::new(control.pack_id, scope.clone(), RuleKind::OneTime, 0);
    assert!(matches!(err, Err(RuleError::NonPositiveMinItems)));

    let err = EvidenceRule::new(
        control.pack_id,
        scope.clone(),
        RuleKind::Frequency { every_days: 0 },
        1,
    );
    assert!(matches!(err, Err(RuleError::NonPositiveDays { .. })));

    let err = EvidenceRule::new(
        control.pack_id,
        scope,
        RuleKind::RollingWindow { window_days: -7 },
        1,
    );
    assert!(matches!(err, Err(RuleError::NonPositiveDays { .. })));
}

#[test]
fn test_canonical_digest_ignores_key_order() {
    let a = CanonicalBytes::new(&json!({
        "control_code": "PHC-ROM-001",
        "section": "Rooms",
        "evidence": [{"title": "Cert", "category": "certificate"}],
    }))
    .unwrap();
    let b = CanonicalBytes::new(&json!({
        "evidence": [{"category": "certificate", "title": "Cert"}],
        "section": "Rooms",
        "control_code": "PHC-ROM-001",
    }))
    .unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
    assert_eq!(sha256_digest(&a), sha256_digest(&b));

    let c = CanonicalBytes::new(&json!({
        "control_code": "PHC-ROM-001",
        "section": "Storage",
        "evidence": [{"title": "Cert", "category": "certificate"}],
    }))
    .unwrap();
    assert_ne!(sha256_digest(&a), sha256_digest(&c));
}

#[test]
fn test_duplicate_link_is_idempotent() {
    let svc = service();
    let control = seed_control(&svc);
    let t = ts("2026-06-01T08:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t).unwrap();

    let (first, created) = svc
        .link_evidence(control.id, item.id, None, "staff", t)
        .unwrap();
    assert!(created);

    let (second, created) = svc
        .link_evidence(control.id, item.id, None, "other", ts("2026-06-02T08:00:00Z"))
        .unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
    assert_eq!(svc.registry().links.list().len(), 1);
}

#[test]
fn test_download_handle_expires_after_ten_minutes() {
    let issued = ts("2026-06-01T08:00:00Z");
    let handle = DownloadHandle::for_path("/v1/files/abc/content", issued);

    assert!(!handle.is_expired(issued));
    assert!(!handle.is_expired(issued.plus_secs(600)));
    assert!(handle.is_expired(issued.plus_secs(601)));
}

#[test]
fn test_audit_query_is_capped_and_newest_first() {
    let svc = service();
    let control = seed_control(&svc);

    // 250 evidence items, each linked: 500 audit events.
    for i in 0..250 {
        let t = ts("2026-06-01T08:00:00Z").plus_secs(i);
        let item = svc
            .create_evidence(draft(&format!("Cert {i}"), "2026-05-01"), "staff", t)
            .unwrap();
        svc.link_evidence(control.id, item.id, None, "staff", t).unwrap();
    }

    let page = svc.audit().query(&av_store::AuditQuery::default());
    assert_eq!(page.len(), av_store::AUDIT_QUERY_CAP);
    assert!(page.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}
