//! # Record Stores
//!
//! Generic thread-safe in-memory store plus the typed [`Registry`] that
//! holds one store per entity kind and the cross-entity query helpers the
//! service layer needs.
//!
//! All lock scopes are synchronous (`parking_lot`, not `tokio::sync`)
//! because no lock is ever held across an `.await` point.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use av_core::{ControlId, EvidenceId, PackId};
use av_model::{
    ComplianceAlert, Control, ControlNote, ControlStatus, EvidenceFile, EvidenceItem,
    EvidenceLink, EvidenceRule, ExportJob, ExportStatus, StandardPack, Verification,
};

// -- Generic Store ------------------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// `parking_lot::RwLock` is non-poisonable, so a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self { data: Arc::clone(&self.data) }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self { data: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if
    /// not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock, eliminating TOCTOU races
    /// between read and update. Returns `None` if the record doesn't exist,
    /// or `Some(result)` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Typed Registry -----------------------------------------------------------

/// One store per entity kind. Cheaply cloneable; all clones share data.
#[derive(Clone, Default)]
pub struct Registry {
    pub packs: Store<StandardPack>,
    pub controls: Store<Control>,
    pub rules: Store<EvidenceRule>,
    pub evidence: Store<EvidenceItem>,
    pub files: Store<EvidenceFile>,
    pub links: Store<EvidenceLink>,
    pub verifications: Store<Verification>,
    pub alerts: Store<ComplianceAlert>,
    pub notes: Store<ControlNote>,
    /// Cached statuses, keyed by control id.
    pub statuses: Store<ControlStatus>,
    pub exports: Store<ExportJob>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules_for_pack(&self, pack_id: PackId) -> Vec<EvidenceRule> {
        let mut rules: Vec<_> = self
            .rules
            .list()
            .into_iter()
            .filter(|r| r.pack_id == pack_id)
            .collect();
        rules.sort_by_key(|r| *r.id.as_uuid());
        rules
    }

    /// Links for a control, oldest first.
    pub fn links_for_control(&self, control_id: ControlId) -> Vec<EvidenceLink> {
        let mut links: Vec<_> = self
            .links
            .list()
            .into_iter()
            .filter(|l| l.control_id == control_id)
            .collect();
        links.sort_by_key(|l| (l.linked_at, *l.id.as_uuid()));
        links
    }

    /// The existing link between a control and an evidence item, if any.
    pub fn link_between(
        &self,
        control_id: ControlId,
        evidence_id: EvidenceId,
    ) -> Option<EvidenceLink> {
        self.links
            .list()
            .into_iter()
            .find(|l| l.control_id == control_id && l.evidence_item_id == evidence_id)
    }

    /// Evidence items currently linked to a control.
    pub fn evidence_for_control(&self, control_id: ControlId) -> Vec<EvidenceItem> {
        self.links_for_control(control_id)
            .into_iter()
            .filter_map(|l| self.evidence.get(l.evidence_item_id.as_uuid()))
            .collect()
    }

    /// Full verification history for a control, oldest first.
    pub fn verifications_for_control(&self, control_id: ControlId) -> Vec<Verification> {
        let mut vs: Vec<_> = self
            .verifications
            .list()
            .into_iter()
            .filter(|v| v.control_id == control_id)
            .collect();
        vs.sort_by_key(|v| (v.verified_at, *v.id.as_uuid()));
        vs
    }

    pub fn open_alerts_for_control(&self, control_id: ControlId) -> Vec<ComplianceAlert> {
        let mut alerts: Vec<_> = self
            .alerts
            .list()
            .into_iter()
            .filter(|a| a.control_id == control_id && a.is_open())
            .collect();
        alerts.sort_by_key(|a| (a.triggered_at, *a.id.as_uuid()));
        alerts
    }

    pub fn notes_for_control(&self, control_id: ControlId) -> Vec<ControlNote> {
        let mut notes: Vec<_> = self
            .notes
            .list()
            .into_iter()
            .filter(|n| n.control_id == control_id)
            .collect();
        notes.sort_by_key(|n| (n.created_at, *n.id.as_uuid()));
        notes
    }

    pub fn open_corrective_actions(&self, control_id: ControlId) -> usize {
        self.notes
            .list()
            .iter()
            .filter(|n| n.control_id == control_id && n.is_blocking())
            .count()
    }

    pub fn files_for_evidence(&self, evidence_id: EvidenceId) -> Vec<EvidenceFile> {
        let mut files: Vec<_> = self
            .files
            .list()
            .into_iter()
            .filter(|f| f.evidence_item_id == evidence_id)
            .collect();
        files.sort_by_key(|f| (f.uploaded_at, *f.id.as_uuid()));
        files
    }

    /// QUEUED export jobs, oldest request first.
    pub fn queued_exports(&self) -> Vec<ExportJob> {
        let mut jobs: Vec<_> = self
            .exports
            .list()
            .into_iter()
            .filter(|j| j.status == ExportStatus::Queued)
            .collect();
        jobs.sort_by_key(|j| (j.requested_at, *j.id.as_uuid()));
        jobs
    }

    /// Active controls in pack order.
    pub fn active_controls(&self) -> Vec<Control> {
        let mut controls: Vec<_> =
            self.controls.list().into_iter().filter(|c| c.active).collect();
        controls.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.control_code.cmp(&b.control_code))
        });
        controls
    }

    /// Controls of a pack in pack order.
    pub fn controls_for_pack(&self, pack_id: PackId) -> Vec<Control> {
        let mut controls: Vec<_> = self
            .controls
            .list()
            .into_iter()
            .filter(|c| c.pack_id == pack_id)
            .collect();
        controls.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.control_code.cmp(&b.control_code))
        });
        controls
    }
}
