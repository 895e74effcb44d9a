//! # Per-Control Locks
//!
//! Keyed mutual exclusion: at most one in-flight transition per control,
//! never a global lock across controls. The service holds a control's lock
//! for the whole "mutate + recompute + reconcile + audit" sequence.
//!
//! Lock entries are created on first use and never removed; the set of
//! controls is small and stable, so the table only grows to the control
//! count.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use av_core::ControlId;

/// Table of per-control mutexes.
#[derive(Clone, Default)]
pub struct ControlLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ControlLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock handle for one control. The caller keeps the `Arc` alive
    /// for as long as it holds the guard:
    ///
    /// ```ignore
    /// let handle = locks.handle(control_id);
    /// let _guard = handle.lock();
    /// // critical section
    /// ```
    pub fn handle(&self, control_id: ControlId) -> Arc<Mutex<()>> {
        self.inner
            .entry(*control_id.as_uuid())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_control_same_lock() {
        let locks = ControlLocks::new();
        let id = ControlId::new();
        let a = locks.handle(id);
        let b = locks.handle(id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_controls_do_not_contend() {
        let locks = ControlLocks::new();
        let a = locks.handle(ControlId::new());
        let b = locks.handle(ControlId::new());

        let _ga = a.lock();
        // Independent control: acquires immediately.
        assert!(b.try_lock().is_some());
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let locks = ControlLocks::new();
        let id = ControlId::new();
        let handle = locks.handle(id);
        let _guard = handle.lock();

        let other = locks.handle(id);
        assert!(other.try_lock().is_none());
    }
}
