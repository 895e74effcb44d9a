//! # Export Jobs
//!
//! An export job captures a point-in-time snapshot of compliance state and
//! renders it into a content-addressed artifact. Jobs move through a strict
//! lifecycle — QUEUED → RUNNING → COMPLETED | FAILED — and every transition
//! is validated here, so a worker bug cannot resurrect a finished job.
//!
//! ## Design
//!
//! The snapshot is taken at dequeue time, not queue time, and carries no
//! wall-clock fields: two exports of identical state produce byte-identical
//! artifacts and therefore the same digest.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use av_core::{AvError, ContentDigest, ControlId, ExportJobId, PackId, Timestamp};

/// What an export job renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportKind {
    /// One control's full dossier.
    ControlPdf { control_id: ControlId },
    /// Every control in one section of a pack.
    SectionPack { pack_id: PackId, section_code: String },
    /// The entire pack.
    FullPack { pack_id: PackId },
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlPdf { .. } => "CONTROL_PDF",
            Self::SectionPack { .. } => "SECTION_PACK",
            Self::FullPack { .. } => "FULL_PACK",
        }
    }
}

/// Lifecycle state of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An export job record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportJob {
    pub id: ExportJobId,
    pub kind: ExportKind,
    pub status: ExportStatus,
    pub requested_by: String,
    pub requested_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    /// Digest of the rendered artifact. Set only on COMPLETED.
    pub artifact_digest: Option<ContentDigest>,
    /// Artifact size in bytes. Set only on COMPLETED.
    pub artifact_size: Option<u64>,
    /// Failure reason. Set only on FAILED.
    pub error: Option<String>,
}

impl ExportJob {
    pub fn queue(kind: ExportKind, requested_by: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: ExportJobId::new(),
            kind,
            status: ExportStatus::Queued,
            requested_by: requested_by.into(),
            requested_at: now,
            started_at: None,
            finished_at: None,
            artifact_digest: None,
            artifact_size: None,
            error: None,
        }
    }

    fn transition(&self, to: ExportStatus) -> Result<(), AvError> {
        let ok = matches!(
            (self.status, to),
            (ExportStatus::Queued, ExportStatus::Running)
                | (ExportStatus::Running, ExportStatus::Completed)
                | (ExportStatus::Running, ExportStatus::Failed)
        );
        if ok {
            Ok(())
        } else {
            Err(AvError::InvalidTransition(format!(
                "export job {} -> {}",
                self.status, to
            )))
        }
    }

    /// Claim the job for a worker. Fails unless currently QUEUED.
    pub fn mark_running(&mut self, now: Timestamp) -> Result<(), AvError> {
        self.transition(ExportStatus::Running)?;
        self.status = ExportStatus::Running;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(
        &mut self,
        digest: ContentDigest,
        size: u64,
        now: Timestamp,
    ) -> Result<(), AvError> {
        self.transition(ExportStatus::Completed)?;
        self.status = ExportStatus::Completed;
        self.finished_at = Some(now);
        self.artifact_digest = Some(digest);
        self.artifact_size = Some(size);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), AvError> {
        self.transition(ExportStatus::Failed)?;
        self.status = ExportStatus::Failed;
        self.finished_at = Some(now);
        self.error = Some(reason.into());
        Ok(())
    }
}
