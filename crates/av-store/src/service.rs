//! # Compliance Service
//!
//! The single entry point for every state change. Each mutating operation
//! runs the full sequence "mutate + recompute + reconcile alerts + audit"
//! inside its control's critical section, so the cached status, the alert
//! set, and the audit trail always agree with the evidence records.
//!
//! ## Design
//!
//! - Link and note mutations take the control's lock blocking: they are
//!   short and callers expect them to succeed.
//! - Verification decisions use **try-lock**: a concurrent transition on
//!   the same control fails fast with `Conflict`, and the caller retries
//!   by re-reading status.
//! - The clock is injected. Every operation takes `now`, which makes the
//!   whole service deterministic under test.
//! - Demotion from a cached VERIFIED status is never silent: the service
//!   compares against the previous cache entry and writes a
//!   `STATUS_DEMOTED` audit event when the new status is lower.

use std::sync::Arc;

use chrono::NaiveDate;

use av_core::{
    AvError, ContentDigest, ControlId, EvidenceFileId, EvidenceId, ExportJobId, LinkId, NoteId,
    Timestamp, VerificationId,
};
use av_engine::{compute_status, reconcile, StatusInputs, DEFAULT_LOOKAHEAD_DAYS};
use av_model::{
    AuditAction, AuditEvent, Control, ControlNote, ControlStatus, EvidenceFile,
    EvidenceItem, EvidenceLink, EvidenceRule, ExportJob, ExportKind, NoteType, StandardPack,
    Verification, VerificationStatus,
};

use crate::audit::AuditLog;
use crate::blob::{BlobStore, EVIDENCE_BUCKET};
use crate::locks::ControlLocks;
use crate::store::Registry;

// -- Inputs and read models ---------------------------------------------------

/// Caller-supplied fields for a new evidence item.
#[derive(Debug, Clone)]
pub struct EvidenceDraft {
    pub title: String,
    pub category: String,
    pub subtype: Option<String>,
    pub notes: Option<String>,
    pub event_date: NaiveDate,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

/// One row of a control's evidence timeline.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub link: EvidenceLink,
    pub evidence: EvidenceItem,
    pub files: Vec<EvidenceFile>,
}

/// A control with its evidence links in link order.
#[derive(Debug, Clone)]
pub struct ControlTimeline {
    pub control: Control,
    pub entries: Vec<TimelineEntry>,
}

/// Result of a full alert sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOutcome {
    pub controls_checked: usize,
    pub alerts_raised: usize,
    pub alerts_cleared: usize,
}

// -- Service ------------------------------------------------------------------

/// Orchestrates all compliance state changes.
#[derive(Clone)]
pub struct ComplianceService {
    registry: Registry,
    locks: ControlLocks,
    audit: AuditLog,
    blobs: Arc<dyn BlobStore>,
    lookahead_days: u64,
}

impl ComplianceService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            registry: Registry::new(),
            locks: ControlLocks::new(),
            audit: AuditLog::new(),
            blobs,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }

    /// Override the NEAR_DUE lookahead window.
    pub fn with_lookahead_days(mut self, days: u64) -> Self {
        self.lookahead_days = days;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn locks(&self) -> &ControlLocks {
        &self.locks
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    // -- Pack administration --------------------------------------------------

    pub fn insert_pack(&self, pack: StandardPack) {
        self.registry.packs.insert(*pack.id.as_uuid(), pack);
    }

    /// Add a control to a pack. Rejected once the pack is published.
    pub fn insert_control(&self, control: Control) -> Result<Control, AvError> {
        let pack = self
            .registry
            .packs
            .get(control.pack_id.as_uuid())
            .ok_or_else(|| AvError::NotFound(format!("pack {}", control.pack_id)))?;
        if !pack.is_mutable() {
            return Err(AvError::Conflict(format!(
                "pack {} is published; controls are frozen",
                pack.id
            )));
        }
        self.registry
            .controls
            .insert(*control.id.as_uuid(), control.clone());
        Ok(control)
    }

    /// Register an evidence rule after construction-time validation.
    pub fn insert_rule(&self, rule: EvidenceRule) -> Result<EvidenceRule, AvError> {
        if !self.registry.packs.contains(rule.pack_id.as_uuid()) {
            return Err(AvError::NotFound(format!("pack {}", rule.pack_id)));
        }
        rule.validate()
            .map_err(|e| AvError::Validation(e.to_string()))?;
        self.registry.rules.insert(*rule.id.as_uuid(), rule.clone());
        Ok(rule)
    }

    // -- Evidence -------------------------------------------------------------

    pub fn create_evidence(
        &self,
        draft: EvidenceDraft,
        actor: &str,
        now: Timestamp,
    ) -> Result<EvidenceItem, AvError> {
        if draft.title.trim().is_empty() {
            return Err(AvError::Validation("evidence title is required".to_string()));
        }
        if draft.category.trim().is_empty() {
            return Err(AvError::Validation("evidence category is required".to_string()));
        }
        if let (Some(from), Some(until)) = (draft.valid_from, draft.valid_until) {
            if from > until {
                return Err(AvError::Validation(
                    "valid_from must not be after valid_until".to_string(),
                ));
            }
        }

        let item = EvidenceItem {
            id: EvidenceId::new(),
            title: draft.title,
            category: draft.category,
            subtype: draft.subtype,
            notes: draft.notes,
            event_date: draft.event_date,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            created_by: Some(actor.to_string()),
            created_at: now,
        };
        self.registry.evidence.insert(*item.id.as_uuid(), item.clone());
        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            AuditAction::EvidenceCreated,
            "evidence",
            item.id,
            format!("evidence item '{}' created", item.title),
            now,
        ));
        Ok(item)
    }

    /// Store a file against an evidence item. The blob is content-hashed on
    /// write; the record carries the hash for integrity checks on read.
    pub fn upload_file(
        &self,
        evidence_id: EvidenceId,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
        actor: &str,
        now: Timestamp,
    ) -> Result<EvidenceFile, AvError> {
        if !self.registry.evidence.contains(evidence_id.as_uuid()) {
            return Err(AvError::NotFound(format!("evidence {evidence_id}")));
        }
        if filename.trim().is_empty() {
            return Err(AvError::Validation("filename is required".to_string()));
        }
        if bytes.is_empty() {
            return Err(AvError::Validation("file body is empty".to_string()));
        }

        let object_key = format!("{evidence_id}/{filename}");
        let sha256 = self.blobs.put(EVIDENCE_BUCKET, &object_key, bytes)?;

        let file = EvidenceFile {
            id: EvidenceFileId::new(),
            evidence_item_id: evidence_id,
            bucket: EVIDENCE_BUCKET.to_string(),
            object_key,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as i64,
            sha256,
            uploaded_at: now,
        };
        self.registry.files.insert(*file.id.as_uuid(), file.clone());
        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            AuditAction::EvidenceFileUploaded,
            "evidence_file",
            file.id,
            format!("file '{}' uploaded ({} bytes)", file.filename, file.size_bytes),
            now,
        ));
        Ok(file)
    }

    /// Fetch a file's bytes with integrity verification.
    pub fn read_file(&self, file_id: EvidenceFileId) -> Result<(EvidenceFile, Vec<u8>), AvError> {
        let file = self
            .registry
            .files
            .get(file_id.as_uuid())
            .ok_or_else(|| AvError::NotFound(format!("file {file_id}")))?;
        let bytes = self.blobs.get(&file.bucket, &file.object_key)?;
        Ok((file, bytes))
    }

    // -- Linking --------------------------------------------------------------

    /// Link an evidence item to a control.
    ///
    /// Idempotent: if the pair is already linked, the existing link is
    /// returned unchanged — no recompute, no audit event. Returns the link
    /// and whether it was newly created.
    pub fn link_evidence(
        &self,
        control_id: ControlId,
        evidence_id: EvidenceId,
        relevance_note: Option<String>,
        actor: &str,
        now: Timestamp,
    ) -> Result<(EvidenceLink, bool), AvError> {
        let control = self.control(control_id)?;
        if !self.registry.evidence.contains(evidence_id.as_uuid()) {
            return Err(AvError::NotFound(format!("evidence {evidence_id}")));
        }

        let handle = self.locks.handle(control_id);
        let _guard = handle.lock();

        if let Some(existing) = self.registry.link_between(control_id, evidence_id) {
            return Ok((existing, false));
        }

        let link = EvidenceLink {
            id: LinkId::new(),
            control_id,
            evidence_item_id: evidence_id,
            relevance_note,
            linked_by: Some(actor.to_string()),
            linked_at: now,
        };
        self.registry.links.insert(*link.id.as_uuid(), link.clone());
        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            AuditAction::EvidenceLinked,
            "control",
            control_id,
            format!("evidence {evidence_id} linked"),
            now,
        ));
        self.recompute_locked(&control, Some(actor), now);
        Ok((link, true))
    }

    pub fn unlink_evidence(
        &self,
        control_id: ControlId,
        link_id: LinkId,
        actor: &str,
        now: Timestamp,
    ) -> Result<(), AvError> {
        let control = self.control(control_id)?;

        let handle = self.locks.handle(control_id);
        let _guard = handle.lock();

        let link = self
            .registry
            .links
            .get(link_id.as_uuid())
            .filter(|l| l.control_id == control_id)
            .ok_or_else(|| AvError::NotFound(format!("link {link_id}")))?;
        self.registry.links.remove(link_id.as_uuid());

        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            AuditAction::EvidenceUnlinked,
            "control",
            control_id,
            format!("evidence {} unlinked", link.evidence_item_id),
            now,
        ));
        self.recompute_locked(&control, Some(actor), now);
        Ok(())
    }

    // -- Verification ---------------------------------------------------------

    /// Record a VERIFIED decision for a control.
    pub fn verify(
        &self,
        control_id: ControlId,
        actor: &str,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<Verification, AvError> {
        self.decide(control_id, VerificationStatus::Verified, actor, comment, now)
    }

    /// Record a REJECTED decision. A rejection requires a comment.
    pub fn reject(
        &self,
        control_id: ControlId,
        actor: &str,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<Verification, AvError> {
        match &comment {
            Some(c) if !c.trim().is_empty() => {}
            _ => {
                return Err(AvError::Validation(
                    "a rejection requires a comment".to_string(),
                ))
            }
        }
        self.decide(control_id, VerificationStatus::Rejected, actor, comment, now)
    }

    fn decide(
        &self,
        control_id: ControlId,
        status: VerificationStatus,
        actor: &str,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<Verification, AvError> {
        let control = self.control(control_id)?;

        let handle = self.locks.handle(control_id);
        let Some(_guard) = handle.try_lock() else {
            return Err(AvError::Conflict(format!(
                "a transition is already in flight for control {control_id}"
            )));
        };

        // The decision observes the evidence-link set as of this instant;
        // any link with a later `linked_at` invalidates it.
        let verification = Verification {
            id: VerificationId::new(),
            control_id,
            status,
            verified_by: actor.to_string(),
            verified_at: now,
            evidence_snapshot_at: Some(now),
            comment: comment.unwrap_or_default(),
        };
        self.registry
            .verifications
            .insert(*verification.id.as_uuid(), verification.clone());

        let action = match status {
            VerificationStatus::Verified => AuditAction::ControlVerified,
            VerificationStatus::Rejected => AuditAction::ControlRejected,
        };
        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            action,
            "control",
            control_id,
            format!("control {} {}", control.control_code, status),
            now,
        ));
        self.recompute_locked(&control, Some(actor), now);
        Ok(verification)
    }

    // -- Status ---------------------------------------------------------------

    /// Cached status, computing it first if no cache entry exists yet.
    pub fn get_status(&self, control_id: ControlId, now: Timestamp) -> Result<ControlStatus, AvError> {
        if let Some(cached) = self.registry.statuses.get(control_id.as_uuid()) {
            return Ok(cached);
        }
        self.recompute(control_id, now)
    }

    /// Force a recomputation under the control's lock.
    pub fn recompute(&self, control_id: ControlId, now: Timestamp) -> Result<ControlStatus, AvError> {
        let control = self.control(control_id)?;
        let handle = self.locks.handle(control_id);
        let _guard = handle.lock();
        Ok(self.recompute_locked(&control, None, now).status)
    }

    pub fn timeline(&self, control_id: ControlId) -> Result<ControlTimeline, AvError> {
        let control = self.control(control_id)?;
        let entries = self
            .registry
            .links_for_control(control_id)
            .into_iter()
            .filter_map(|link| {
                let evidence = self.registry.evidence.get(link.evidence_item_id.as_uuid())?;
                let files = self.registry.files_for_evidence(evidence.id);
                Some(TimelineEntry { link, evidence, files })
            })
            .collect();
        Ok(ControlTimeline { control, entries })
    }

    // -- Notes ----------------------------------------------------------------

    pub fn add_note(
        &self,
        control_id: ControlId,
        note_type: NoteType,
        body: &str,
        actor: &str,
        now: Timestamp,
    ) -> Result<ControlNote, AvError> {
        let control = self.control(control_id)?;
        if body.trim().is_empty() {
            return Err(AvError::Validation("note body is required".to_string()));
        }

        let handle = self.locks.handle(control_id);
        let _guard = handle.lock();

        let note = ControlNote::new(control_id, note_type, body, actor, now);
        self.registry.notes.insert(*note.id.as_uuid(), note.clone());
        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            AuditAction::NoteCreated,
            "note",
            note.id,
            format!("{} note added", note.note_type),
            now,
        ));
        // Corrective actions gate readiness, so the status may change.
        if note.is_blocking() {
            self.recompute_locked(&control, Some(actor), now);
        }
        Ok(note)
    }

    pub fn resolve_note(
        &self,
        note_id: NoteId,
        actor: &str,
        now: Timestamp,
    ) -> Result<ControlNote, AvError> {
        self.note_transition(note_id, actor, now, AuditAction::NoteResolved, "resolved", |note| {
            note.resolve(actor, now)
        })
    }

    pub fn reopen_note(
        &self,
        note_id: NoteId,
        actor: &str,
        now: Timestamp,
    ) -> Result<ControlNote, AvError> {
        self.note_transition(note_id, actor, now, AuditAction::NoteReopened, "reopened", |note| {
            note.reopen()
        })
    }

    fn note_transition(
        &self,
        note_id: NoteId,
        actor: &str,
        now: Timestamp,
        action: AuditAction,
        verb: &str,
        apply: impl FnOnce(&mut ControlNote) -> Result<(), AvError>,
    ) -> Result<ControlNote, AvError> {
        let existing = self
            .registry
            .notes
            .get(note_id.as_uuid())
            .ok_or_else(|| AvError::NotFound(format!("note {note_id}")))?;
        let control = self.control(existing.control_id)?;

        let handle = self.locks.handle(control.id);
        let _guard = handle.lock();

        let updated = self
            .registry
            .notes
            .try_update(note_id.as_uuid(), |note| {
                apply(note)?;
                Ok::<ControlNote, AvError>(note.clone())
            })
            .ok_or_else(|| AvError::NotFound(format!("note {note_id}")))??;

        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            action,
            "note",
            note_id,
            format!("{} note {verb}", updated.note_type),
            now,
        ));
        if updated.note_type == NoteType::CorrectiveAction {
            self.recompute_locked(&control, Some(actor), now);
        }
        Ok(updated)
    }

    // -- Alerts ---------------------------------------------------------------

    /// Reconcile alerts for every active control.
    pub fn sweep_alerts(&self, now: Timestamp) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        for control in self.registry.active_controls() {
            let handle = self.locks.handle(control.id);
            let _guard = handle.lock();
            let recomputed = self.recompute_locked(&control, None, now);
            outcome.controls_checked += 1;
            outcome.alerts_raised += recomputed.alerts_raised;
            outcome.alerts_cleared += recomputed.alerts_cleared;
        }
        tracing::info!(
            controls = outcome.controls_checked,
            raised = outcome.alerts_raised,
            cleared = outcome.alerts_cleared,
            "alert sweep finished"
        );
        outcome
    }

    // -- Exports --------------------------------------------------------------

    /// Queue an export job after validating its scope.
    pub fn enqueue_export(
        &self,
        kind: ExportKind,
        actor: &str,
        now: Timestamp,
    ) -> Result<ExportJob, AvError> {
        match &kind {
            ExportKind::ControlPdf { control_id } => {
                self.control(*control_id)?;
            }
            ExportKind::SectionPack { pack_id, section_code } => {
                if !self.registry.packs.contains(pack_id.as_uuid()) {
                    return Err(AvError::NotFound(format!("pack {pack_id}")));
                }
                if section_code.trim().is_empty() {
                    return Err(AvError::Validation("section code is required".to_string()));
                }
            }
            ExportKind::FullPack { pack_id } => {
                if !self.registry.packs.contains(pack_id.as_uuid()) {
                    return Err(AvError::NotFound(format!("pack {pack_id}")));
                }
            }
        }

        let job = ExportJob::queue(kind, actor, now);
        self.registry.exports.insert(*job.id.as_uuid(), job.clone());
        self.audit.record(AuditEvent::new(
            Some(actor.to_string()),
            AuditAction::ExportQueued,
            "export_job",
            job.id,
            format!("{} export queued", job.kind.as_str()),
            now,
        ));
        Ok(job)
    }

    /// Atomically claim the oldest QUEUED job, if any.
    ///
    /// The QUEUED→RUNNING transition is what makes the claim exclusive: a
    /// competing worker racing on the same candidate loses inside
    /// `try_update` and moves on.
    pub fn claim_next_export(&self, now: Timestamp) -> Option<ExportJob> {
        for candidate in self.registry.queued_exports() {
            let claimed = self.registry.exports.try_update(candidate.id.as_uuid(), |job| {
                job.mark_running(now)?;
                Ok::<ExportJob, AvError>(job.clone())
            });
            if let Some(Ok(job)) = claimed {
                return Some(job);
            }
        }
        None
    }

    pub fn complete_export(
        &self,
        job_id: ExportJobId,
        digest: ContentDigest,
        size: u64,
        now: Timestamp,
    ) -> Result<ExportJob, AvError> {
        let job = self
            .registry
            .exports
            .try_update(job_id.as_uuid(), |job| {
                job.complete(digest.clone(), size, now)?;
                Ok::<ExportJob, AvError>(job.clone())
            })
            .ok_or_else(|| AvError::NotFound(format!("export job {job_id}")))??;

        self.audit.record(AuditEvent::new(
            None,
            AuditAction::ExportCreated,
            "export_job",
            job_id,
            format!("{} export completed ({} bytes)", job.kind.as_str(), size),
            now,
        ));
        Ok(job)
    }

    pub fn fail_export(
        &self,
        job_id: ExportJobId,
        reason: &str,
        now: Timestamp,
    ) -> Result<ExportJob, AvError> {
        let job = self
            .registry
            .exports
            .try_update(job_id.as_uuid(), |job| {
                job.fail(reason, now)?;
                Ok::<ExportJob, AvError>(job.clone())
            })
            .ok_or_else(|| AvError::NotFound(format!("export job {job_id}")))??;

        self.audit.record(AuditEvent::new(
            None,
            AuditAction::ExportFailed,
            "export_job",
            job_id,
            format!("{} export failed: {reason}", job.kind.as_str()),
            now,
        ));
        Ok(job)
    }

    // -- Internals ------------------------------------------------------------

    fn control(&self, control_id: ControlId) -> Result<Control, AvError> {
        self.registry
            .controls
            .get(control_id.as_uuid())
            .ok_or_else(|| AvError::NotFound(format!("control {control_id}")))
    }

    fn latest_linked_at(&self, control_id: ControlId) -> Option<Timestamp> {
        self.registry
            .links_for_control(control_id)
            .iter()
            .map(|l| l.linked_at)
            .max()
    }

    /// Recompute status and reconcile alerts. Caller holds the control's
    /// lock.
    fn recompute_locked(
        &self,
        control: &Control,
        actor: Option<&str>,
        now: Timestamp,
    ) -> Recomputed {
        let rules = self.registry.rules_for_pack(control.pack_id);
        let evidence = self.registry.evidence_for_control(control.id);
        let verifications = self.registry.verifications_for_control(control.id);
        let inputs = StatusInputs {
            control,
            rules: &rules,
            evidence: &evidence,
            latest_linked_at: self.latest_linked_at(control.id),
            verifications: &verifications,
            open_corrective_actions: self.registry.open_corrective_actions(control.id),
        };
        let status = compute_status(&inputs, now.date(), now);

        let previous = self.registry.statuses.get(control.id.as_uuid());
        let demoted = previous.as_ref().is_some_and(|prev| {
            prev.computed_status == av_model::ComputedStatus::Verified
                && status.computed_status != av_model::ComputedStatus::Verified
        });
        if demoted {
            tracing::info!(
                control = %control.control_code,
                from = %av_model::ComputedStatus::Verified,
                to = %status.computed_status,
                "verified status demoted"
            );
            self.audit.record(AuditEvent::new(
                actor.map(str::to_string),
                AuditAction::StatusDemoted,
                "control",
                control.id,
                format!(
                    "status demoted from VERIFIED to {}",
                    status.computed_status
                ),
                now,
            ));
        }
        self.registry
            .statuses
            .insert(*control.id.as_uuid(), status.clone());

        let open = self.registry.open_alerts_for_control(control.id);
        let delta = reconcile(&status, &open, now, self.lookahead_days);
        for alert in &delta.raised {
            self.registry.alerts.insert(*alert.id.as_uuid(), alert.clone());
            self.audit.record(AuditEvent::new(
                None,
                AuditAction::AlertRaised,
                "alert",
                alert.id,
                format!("{} alert raised: {}", alert.alert_type, alert.message),
                now,
            ));
        }
        for alert in &delta.cleared {
            self.registry.alerts.insert(*alert.id.as_uuid(), alert.clone());
            self.audit.record(AuditEvent::new(
                None,
                AuditAction::AlertCleared,
                "alert",
                alert.id,
                format!("{} alert cleared", alert.alert_type),
                now,
            ));
        }
        Recomputed {
            status,
            alerts_raised: delta.raised.len(),
            alerts_cleared: delta.cleared.len(),
        }
    }
}

/// Outcome of one locked recomputation.
struct Recomputed {
    status: ControlStatus,
    alerts_raised: usize,
    alerts_cleared: usize,
}
