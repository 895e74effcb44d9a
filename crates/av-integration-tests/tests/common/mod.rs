//! Shared fixtures for the integration scenarios.

use std::sync::Arc;

use av_core::{ControlId, PackId, Timestamp};
use av_model::{Control, EvidenceRule, RuleKind, RuleScope, StandardPack};
use av_store::{ComplianceService, EvidenceDraft, MemoryBlobStore};

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

pub fn service() -> ComplianceService {
    ComplianceService::new(Arc::new(MemoryBlobStore::new()))
}

/// One pack, one active control in section ROM.
pub fn seed_control(svc: &ComplianceService) -> Control {
    seed_control_coded(svc, "PHC-ROM-001", 1)
}

pub fn seed_control_coded(svc: &ComplianceService, code: &str, sort_order: i32) -> Control {
    let pack_id = match svc.registry().packs.list().first() {
        Some(pack) => pack.id,
        None => {
            let pack = StandardPack::new("PHC", "Lab Licensing", "1.0", "abc123");
            let id = pack.id;
            svc.insert_pack(pack);
            id
        }
    };
    let control = Control {
        id: ControlId::new(),
        pack_id,
        control_code: code.to_string(),
        section: "Rooms".to_string(),
        standard: "Hygiene".to_string(),
        indicator: "Cleaning log".to_string(),
        sort_order,
        active: true,
        created_at: ts("2026-01-01T00:00:00Z"),
    };
    svc.insert_control(control).unwrap()
}

pub fn one_time_rule(svc: &ComplianceService, pack_id: PackId, control_id: ControlId) {
    let rule = EvidenceRule::new(
        pack_id,
        RuleScope::Control { control_id },
        RuleKind::OneTime,
        1,
    )
    .unwrap();
    svc.insert_rule(rule).unwrap();
}

pub fn verified_rule(svc: &ComplianceService, pack_id: PackId, control_id: ControlId) {
    let rule = EvidenceRule::new(
        pack_id,
        RuleScope::Control { control_id },
        RuleKind::OneTime,
        1,
    )
    .unwrap()
    .with_verification();
    svc.insert_rule(rule).unwrap();
}

pub fn draft(title: &str, event_date: &str) -> EvidenceDraft {
    EvidenceDraft {
        title: title.to_string(),
        category: "certificate".to_string(),
        subtype: None,
        notes: None,
        event_date: event_date.parse().unwrap(),
        valid_from: None,
        valid_until: None,
    }
}
