//! # Export Snapshots
//!
//! A snapshot is the deterministic data an export renders: pack metadata,
//! controls in pack order, each with its recomputed status and its linked
//! evidence (files included, blob-verified).
//!
//! ## Design
//!
//! Snapshots carry **no wall-clock fields** — no `computed_at`, no
//! `generated_at`. Two exports of identical underlying data on the same
//! evaluation date serialize to identical canonical bytes and therefore the
//! same content hash, which is how a re-run detects a no-op. Any unreadable
//! file fails assembly as a whole: a compliance artifact never silently
//! omits content.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use av_core::{AvError, Timestamp};
use av_model::{ComputedStatus, Control, ExportJob, ExportKind, StandardPack};
use av_store::ComplianceService;

/// A file entry inside a snapshot. Integrity-verified during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
}

/// One linked evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub title: String,
    pub category: String,
    pub subtype: Option<String>,
    pub event_date: NaiveDate,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub files: Vec<FileSnapshot>,
}

/// One control with its evaluated state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub control_code: String,
    pub section: String,
    pub section_code: String,
    pub standard: String,
    pub indicator: String,
    pub computed_status: ComputedStatus,
    pub last_evidence_date: Option<NaiveDate>,
    pub next_due_date: Option<NaiveDate>,
    pub evidence: Vec<EvidenceSnapshot>,
}

/// The full artifact payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub authority_code: String,
    pub pack_name: String,
    pub pack_version: String,
    /// CONTROL_PDF, SECTION_PACK, or FULL_PACK.
    pub scope: String,
    /// The evaluation date statuses were computed against.
    pub as_of_date: NaiveDate,
    pub controls: Vec<ControlSnapshot>,
}

fn snapshot_control(
    service: &ComplianceService,
    control: &Control,
    now: Timestamp,
) -> Result<ControlSnapshot, AvError> {
    // Recompute rather than trust the cache: the snapshot is "as of
    // dequeue time" even for controls whose cache is cold or stale.
    let status = service.recompute(control.id, now)?;

    let mut evidence = Vec::new();
    for entry in service.timeline(control.id)?.entries {
        let mut files = Vec::new();
        for file in &entry.files {
            // Integrity check; an unreadable blob fails the whole export.
            service.read_file(file.id)?;
            files.push(FileSnapshot {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
                size_bytes: file.size_bytes,
                sha256: file.sha256.clone(),
            });
        }
        evidence.push(EvidenceSnapshot {
            title: entry.evidence.title.clone(),
            category: entry.evidence.category.clone(),
            subtype: entry.evidence.subtype.clone(),
            event_date: entry.evidence.event_date,
            valid_from: entry.evidence.valid_from,
            valid_until: entry.evidence.valid_until,
            files,
        });
    }

    Ok(ControlSnapshot {
        control_code: control.control_code.clone(),
        section: control.section.clone(),
        section_code: control.section_code().to_string(),
        standard: control.standard.clone(),
        indicator: control.indicator.clone(),
        computed_status: status.computed_status,
        last_evidence_date: status.last_evidence_date,
        next_due_date: status.next_due_date,
        evidence,
    })
}

/// Assemble the snapshot for a claimed job, as of `now`.
pub fn assemble_snapshot(
    service: &ComplianceService,
    job: &ExportJob,
    now: Timestamp,
) -> Result<ExportSnapshot, AvError> {
    let registry = service.registry();

    let (pack, controls, scope) = match &job.kind {
        ExportKind::ControlPdf { control_id } => {
            let control = registry
                .controls
                .get(control_id.as_uuid())
                .ok_or_else(|| AvError::NotFound(format!("control {control_id}")))?;
            let pack = pack_of(service, &control)?;
            (pack, vec![control], "CONTROL_PDF")
        }
        ExportKind::SectionPack { pack_id, section_code } => {
            let pack = registry
                .packs
                .get(pack_id.as_uuid())
                .ok_or_else(|| AvError::NotFound(format!("pack {pack_id}")))?;
            let controls = registry
                .controls_for_pack(*pack_id)
                .into_iter()
                .filter(|c| c.active && c.section_code() == section_code)
                .collect();
            (pack, controls, "SECTION_PACK")
        }
        ExportKind::FullPack { pack_id } => {
            let pack = registry
                .packs
                .get(pack_id.as_uuid())
                .ok_or_else(|| AvError::NotFound(format!("pack {pack_id}")))?;
            let controls = registry
                .controls_for_pack(*pack_id)
                .into_iter()
                .filter(|c| c.active)
                .collect();
            (pack, controls, "FULL_PACK")
        }
    };

    let mut control_snapshots = Vec::with_capacity(controls.len());
    for control in &controls {
        control_snapshots.push(snapshot_control(service, control, now)?);
    }

    Ok(ExportSnapshot {
        authority_code: pack.authority_code.clone(),
        pack_name: pack.name.clone(),
        pack_version: pack.version.clone(),
        scope: scope.to_string(),
        as_of_date: now.date(),
        controls: control_snapshots,
    })
}

fn pack_of(service: &ComplianceService, control: &Control) -> Result<StandardPack, AvError> {
    service
        .registry()
        .packs
        .get(control.pack_id.as_uuid())
        .ok_or_else(|| AvError::NotFound(format!("pack {}", control.pack_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_core::CanonicalBytes;
    use av_model::{EvidenceRule, RuleKind, RuleScope};
    use av_store::{EvidenceDraft, MemoryBlobStore};
    use std::sync::Arc;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn seeded() -> (ComplianceService, ExportJob) {
        let svc = ComplianceService::new(Arc::new(MemoryBlobStore::new()));
        let pack = StandardPack::new("PHC", "Lab Licensing", "1.0", "abc");
        let pack_id = pack.id;
        svc.insert_pack(pack);
        let control = svc
            .insert_control(Control {
                id: av_core::ControlId::new(),
                pack_id,
                control_code: "PHC-ROM-001".to_string(),
                section: "Rooms".to_string(),
                standard: "Hygiene".to_string(),
                indicator: "Cleaning log".to_string(),
                sort_order: 1,
                active: true,
                created_at: ts("2026-01-01T00:00:00Z"),
            })
            .unwrap();
        svc.insert_rule(
            EvidenceRule::new(
                pack_id,
                RuleScope::Control { control_id: control.id },
                RuleKind::OneTime,
                1,
            )
            .unwrap(),
        )
        .unwrap();

        let now = ts("2026-06-01T00:00:00Z");
        let item = svc
            .create_evidence(
                EvidenceDraft {
                    title: "Cert".to_string(),
                    category: "certificate".to_string(),
                    subtype: None,
                    notes: None,
                    event_date: "2026-05-01".parse().unwrap(),
                    valid_from: None,
                    valid_until: None,
                },
                "staff",
                now,
            )
            .unwrap();
        svc.upload_file(item.id, "cert.pdf", "application/pdf", b"%PDF", "staff", now)
            .unwrap();
        svc.link_evidence(control.id, item.id, None, "staff", now).unwrap();

        let job = svc
            .enqueue_export(ExportKind::FullPack { pack_id }, "auditor", now)
            .unwrap();
        (svc, job)
    }

    #[test]
    fn test_snapshot_contents() {
        let (svc, job) = seeded();
        let snap = assemble_snapshot(&svc, &job, ts("2026-06-02T00:00:00Z")).unwrap();
        assert_eq!(snap.authority_code, "PHC");
        assert_eq!(snap.controls.len(), 1);
        assert_eq!(snap.controls[0].computed_status, ComputedStatus::Ready);
        assert_eq!(snap.controls[0].evidence.len(), 1);
        assert_eq!(snap.controls[0].evidence[0].files.len(), 1);
    }

    #[test]
    fn test_snapshot_hash_reproducible() {
        let (svc, job) = seeded();
        // Same data, same evaluation date, different wall-clock instants.
        let a = assemble_snapshot(&svc, &job, ts("2026-06-02T01:00:00Z")).unwrap();
        let b = assemble_snapshot(&svc, &job, ts("2026-06-02T09:30:00Z")).unwrap();
        assert_eq!(a, b);

        let ha = av_core::sha256_hex(&CanonicalBytes::new(&a).unwrap());
        let hb = av_core::sha256_hex(&CanonicalBytes::new(&b).unwrap());
        assert_eq!(ha, hb);
    }
}
