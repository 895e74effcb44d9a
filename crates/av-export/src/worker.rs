//! # Export Workers
//!
//! Tokio task pool that drains the QUEUED export job queue. Each job is
//! claimed by exactly one worker through the atomic QUEUED→RUNNING
//! transition; workers race on the claim, never on the work. A RUNNING job
//! always reaches a terminal state — COMPLETED with hash and size, or
//! FAILED with the error text.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use av_core::{sha256_digest_of_bytes, AvError, Timestamp};
use av_model::ExportJob;
use av_store::{ComplianceService, EXPORTS_BUCKET};

use crate::render::ArtifactRenderer;
use crate::snapshot::assemble_snapshot;

/// Claim and process a single job. Returns `None` when the queue is empty,
/// otherwise the job's terminal record.
///
/// Processing never propagates job-level errors to the caller: any failure
/// between claim and completion marks the job FAILED instead, so a queue
/// with one poisoned job keeps draining.
pub fn process_one(
    service: &ComplianceService,
    renderer: &dyn ArtifactRenderer,
    now: Timestamp,
) -> Option<ExportJob> {
    let job = service.claim_next_export(now)?;
    tracing::info!(job_id = %job.id, kind = job.kind.as_str(), "export job claimed");

    match run_job(service, renderer, &job, now) {
        Ok(completed) => {
            tracing::info!(job_id = %completed.id, "export job completed");
            Some(completed)
        }
        Err(err) => {
            tracing::warn!(job_id = %job.id, error = %err, "export job failed");
            match service.fail_export(job.id, &err.to_string(), now) {
                Ok(failed) => Some(failed),
                Err(fail_err) => {
                    // Terminal-state bookkeeping failed; surface the job as
                    // claimed so the loop moves on.
                    tracing::error!(job_id = %job.id, error = %fail_err, "could not mark export failed");
                    Some(job)
                }
            }
        }
    }
}

fn run_job(
    service: &ComplianceService,
    renderer: &dyn ArtifactRenderer,
    job: &ExportJob,
    now: Timestamp,
) -> Result<ExportJob, AvError> {
    // Snapshot as of dequeue time, not enqueue time: the job may have
    // waited in the queue while the data moved on.
    let snapshot = assemble_snapshot(service, job, now)?;
    let bytes = renderer.render(&snapshot)?;
    let digest = sha256_digest_of_bytes(&bytes);

    let object_key = artifact_object_key(service, job, renderer.extension())?;
    service.blobs().put(EXPORTS_BUCKET, &object_key, &bytes)?;
    service.complete_export(job.id, digest, bytes.len() as u64, now)
}

/// Blob object key for a job's artifact. Derived from the pack the job
/// targets, so the same key is produced at write time (worker) and at
/// read time (download route).
pub fn artifact_object_key(
    service: &ComplianceService,
    job: &ExportJob,
    extension: &str,
) -> Result<String, AvError> {
    let registry = service.registry();
    let pack_id = match &job.kind {
        av_model::ExportKind::ControlPdf { control_id } => {
            registry
                .controls
                .get(control_id.as_uuid())
                .ok_or_else(|| AvError::NotFound(format!("control {control_id}")))?
                .pack_id
        }
        av_model::ExportKind::SectionPack { pack_id, .. }
        | av_model::ExportKind::FullPack { pack_id } => *pack_id,
    };
    let pack = registry
        .packs
        .get(pack_id.as_uuid())
        .ok_or_else(|| AvError::NotFound(format!("pack {pack_id}")))?;
    Ok(format!(
        "exports/{}/{}/{}-{}.{}",
        pack.authority_code,
        pack.version,
        job.kind.as_str().to_lowercase(),
        job.id,
        extension
    ))
}

/// Hook invoked after a job reaches a terminal state. Receives the job's
/// terminal record and the clock reading that stamped the transition, so
/// an implementation can also recover the audit events the transition
/// appended. The in-memory registry stays authoritative; hook failures
/// must not reach the queue, so implementations log and swallow their own
/// errors.
pub type ExportMirror = Arc<dyn Fn(ExportJob, Timestamp) + Send + Sync>;

/// A pool of export workers with cooperative shutdown.
pub struct ExportWorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ExportWorkerPool {
    /// Spawn `workers` tasks polling the queue every `poll_interval`.
    pub fn spawn(
        service: ComplianceService,
        renderer: Arc<dyn ArtifactRenderer>,
        workers: usize,
        poll_interval: Duration,
    ) -> Self {
        Self::spawn_with_mirror(service, renderer, workers, poll_interval, None)
    }

    /// Like [`ExportWorkerPool::spawn`], with a hook called once per job as
    /// it reaches its terminal state.
    pub fn spawn_with_mirror(
        service: ComplianceService,
        renderer: Arc<dyn ArtifactRenderer>,
        workers: usize,
        poll_interval: Duration,
        mirror: Option<ExportMirror>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let handles = (0..workers.max(1))
            .map(|worker| {
                let service = service.clone();
                let renderer = Arc::clone(&renderer);
                let mirror = mirror.clone();
                let mut shutdown_rx = shutdown.subscribe();
                tokio::spawn(async move {
                    tracing::debug!(worker, "export worker started");
                    loop {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        let now = Timestamp::now();
                        if let Some(job) = process_one(&service, renderer.as_ref(), now) {
                            if let Some(mirror) = &mirror {
                                mirror(job, now);
                            }
                            // Drain eagerly while work is available.
                            continue;
                        }
                        tokio::select! {
                            changed = shutdown_rx.changed() => {
                                if changed.is_err() || *shutdown_rx.borrow() {
                                    break;
                                }
                            }
                            _ = tokio::time::sleep(poll_interval) => {}
                        }
                    }
                    tracing::debug!(worker, "export worker stopped");
                })
            })
            .collect();
        Self { shutdown, handles }
    }

    /// Signal shutdown and wait for every worker to finish its current job.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
