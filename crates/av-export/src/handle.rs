//! # Download Handles
//!
//! Time-limited references to downloadable bytes — export artifacts and
//! evidence files. A handle expires after a fixed window and is
//! re-requested, never renewed in place. Artifact handles exist only for
//! COMPLETED jobs.

use serde::Serialize;
use utoipa::ToSchema;

use av_core::{AvError, Timestamp};
use av_model::{ExportJob, ExportStatus};

/// Handle lifetime in seconds.
pub const HANDLE_EXPIRY_SECS: i64 = 600;

/// A time-limited download reference.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DownloadHandle {
    /// Relative URL the caller fetches the bytes from.
    pub url: String,
    /// Seconds until the handle expires.
    pub expires_in: i64,
    /// Absolute expiry instant.
    pub expires_at: Timestamp,
}

impl DownloadHandle {
    /// Handle for an arbitrary downloadable path.
    pub fn for_path(path: impl Into<String>, now: Timestamp) -> Self {
        let expires_at = now.plus_secs(HANDLE_EXPIRY_SECS);
        Self {
            url: path.into(),
            expires_in: HANDLE_EXPIRY_SECS,
            expires_at,
        }
    }

    /// Handle for a completed export artifact.
    ///
    /// A job that has not COMPLETED yields `NotReady` — a FAILED job is
    /// never downloadable, and a QUEUED/RUNNING one is polled again.
    pub fn for_job(job: &ExportJob, now: Timestamp) -> Result<Self, AvError> {
        if job.status != ExportStatus::Completed {
            return Err(AvError::NotReady(format!(
                "export job {} is {}",
                job.id, job.status
            )));
        }
        Ok(Self::for_path(format!("/v1/exports/{}/artifact", job.id), now))
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_model::ExportKind;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn job() -> ExportJob {
        ExportJob::queue(
            ExportKind::FullPack { pack_id: av_core::PackId::new() },
            "auditor",
            ts("2026-06-01T00:00:00Z"),
        )
    }

    #[test]
    fn test_incomplete_job_is_not_ready() {
        let j = job();
        let err = DownloadHandle::for_job(&j, ts("2026-06-01T00:05:00Z")).unwrap_err();
        assert!(matches!(err, AvError::NotReady(_)));
    }

    #[test]
    fn test_failed_job_is_not_ready() {
        let mut j = job();
        j.mark_running(ts("2026-06-01T00:01:00Z")).unwrap();
        j.fail("boom", ts("2026-06-01T00:02:00Z")).unwrap();
        assert!(DownloadHandle::for_job(&j, ts("2026-06-01T00:05:00Z")).is_err());
    }

    #[test]
    fn test_handle_expiry_window() {
        let now = ts("2026-06-01T00:00:00Z");
        let handle = DownloadHandle::for_path("/v1/files/x/download", now);
        assert_eq!(handle.expires_in, HANDLE_EXPIRY_SECS);
        assert!(!handle.is_expired(ts("2026-06-01T00:09:59Z")));
        assert!(handle.is_expired(ts("2026-06-01T00:10:01Z")));
    }
}
