//! # av-engine: Pure Compliance Computation
//!
//! Deterministic, side-effect-free derivation of control state. Both entry
//! points take every input explicitly — including the clock — so the same
//! call always yields the same answer:
//!
//! - [`compute_status`] evaluates a control's evidence rules against its
//!   linked evidence and verification history.
//! - [`reconcile`] diffs a computed status against the currently open
//!   alerts and decides what to raise and what to clear.
//!
//! ## Design
//!
//! No storage, no I/O, no `Utc::now()`. The service layer owns locking and
//! persistence; this crate owns only the arithmetic, which keeps the rule
//! semantics testable as plain functions.

pub mod alerts;
pub mod status;

pub use alerts::{reconcile, AlertDelta, DEFAULT_LOOKAHEAD_DAYS};
pub use status::{compute_status, evaluate_rule, StatusInputs};
