//! Export artifacts are content-addressed: re-exporting unchanged data
//! reproduces the same hash, and any data change produces a new one.

mod common;

use common::*;

use av_export::{process_one, CanonicalJsonRenderer};
use av_model::{ExportKind, ExportStatus};
use av_store::EXPORTS_BUCKET;

#[test]
fn test_unchanged_data_reproduces_artifact_hash() {
    let svc = service();
    let control = seed_control(&svc);
    one_time_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T08:00:00Z");
    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();

    let kind = ExportKind::FullPack {
        pack_id: control.pack_id,
    };
    svc.enqueue_export(kind.clone(), "staff", t0).unwrap();
    let first = process_one(&svc, &CanonicalJsonRenderer, ts("2026-06-01T09:00:00Z")).unwrap();
    assert_eq!(first.status, ExportStatus::Completed);

    // Hours later, same calendar day, nothing changed.
    svc.enqueue_export(kind, "staff", ts("2026-06-01T17:00:00Z")).unwrap();
    let second = process_one(&svc, &CanonicalJsonRenderer, ts("2026-06-01T21:30:00Z")).unwrap();
    assert_eq!(second.status, ExportStatus::Completed);

    assert_ne!(first.id, second.id);
    assert_eq!(first.artifact_digest, second.artifact_digest);
    assert_eq!(first.artifact_size, second.artifact_size);
}

#[test]
fn test_data_change_changes_artifact_hash() {
    let svc = service();
    let control = seed_control(&svc);
    one_time_rule(&svc, control.pack_id, control.id);

    let t0 = ts("2026-06-01T08:00:00Z");
    let kind = ExportKind::FullPack {
        pack_id: control.pack_id,
    };
    svc.enqueue_export(kind.clone(), "staff", t0).unwrap();
    let before = process_one(&svc, &CanonicalJsonRenderer, t0).unwrap();

    let item = svc.create_evidence(draft("Cert", "2026-05-01"), "staff", t0).unwrap();
    svc.link_evidence(control.id, item.id, None, "staff", t0).unwrap();

    svc.enqueue_export(kind, "staff", t0).unwrap();
    let after = process_one(&svc, &CanonicalJsonRenderer, t0).unwrap();

    assert_ne!(before.artifact_digest, after.artifact_digest);
}

#[test]
fn test_artifact_bytes_match_recorded_digest() {
    let svc = service();
    let control = seed_control(&svc);

    svc.enqueue_export(
        ExportKind::ControlPdf {
            control_id: control.id,
        },
        "staff",
        ts("2026-06-01T08:00:00Z"),
    )
    .unwrap();
    let job = process_one(&svc, &CanonicalJsonRenderer, ts("2026-06-01T08:00:05Z")).unwrap();
    assert_eq!(job.status, ExportStatus::Completed);

    let key = av_export::artifact_object_key(&svc, &job, "json").unwrap();
    let bytes = svc.blobs().get(EXPORTS_BUCKET, &key).unwrap();
    assert_eq!(
        av_core::sha256_digest_of_bytes(&bytes),
        job.artifact_digest.unwrap()
    );
    assert_eq!(bytes.len() as u64, job.artifact_size.unwrap());
}

#[test]
fn test_missing_scope_fails_job_not_queue() {
    let svc = service();
    let control = seed_control(&svc);

    // Queue a job, then delete its control out from under it.
    svc.enqueue_export(
        ExportKind::ControlPdf {
            control_id: control.id,
        },
        "staff",
        ts("2026-06-01T08:00:00Z"),
    )
    .unwrap();
    let _ = svc.registry().controls.remove(control.id.as_uuid());

    let job = process_one(&svc, &CanonicalJsonRenderer, ts("2026-06-01T08:01:00Z")).unwrap();
    assert_eq!(job.status, ExportStatus::Failed);
    assert!(job.error.is_some());

    // The queue keeps draining after a poisoned job.
    svc.enqueue_export(
        ExportKind::FullPack {
            pack_id: control.pack_id,
        },
        "staff",
        ts("2026-06-01T08:02:00Z"),
    )
    .unwrap();
    let next = process_one(&svc, &CanonicalJsonRenderer, ts("2026-06-01T08:03:00Z")).unwrap();
    assert_eq!(next.status, ExportStatus::Completed);
}
