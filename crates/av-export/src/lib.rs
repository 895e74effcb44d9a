//! # av-export: Artifact Assembly and Delivery
//!
//! Turns queued export jobs into content-addressed artifacts:
//!
//! - [`snapshot`] — deterministic point-in-time snapshot of compliance
//!   state, assembled as of dequeue time.
//! - [`render`] — artifact renderers behind a trait; the canonical JSON
//!   renderer ships here.
//! - [`worker`] — tokio worker pool consuming the QUEUED job queue.
//! - [`handle`] — time-limited download handles for completed artifacts
//!   and evidence files.

pub mod handle;
pub mod render;
pub mod snapshot;
pub mod worker;

pub use handle::{DownloadHandle, HANDLE_EXPIRY_SECS};
pub use render::{ArtifactRenderer, CanonicalJsonRenderer};
pub use snapshot::{assemble_snapshot, ControlSnapshot, EvidenceSnapshot, ExportSnapshot, FileSnapshot};
pub use worker::{artifact_object_key, process_one, ExportMirror, ExportWorkerPool};
