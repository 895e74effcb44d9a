//! # Dataset Files
//!
//! A dataset file is a JSON snapshot of the registry: packs, controls,
//! rules, evidence, links, verifications, and notes. `avctl recompute`
//! loads one, seeds an in-memory service with it, and recomputes every
//! control offline — no API server involved.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use av_model::{
    Control, ControlNote, EvidenceItem, EvidenceLink, EvidenceRule, StandardPack, Verification,
};
use av_store::ComplianceService;

/// The on-disk dataset shape. Every section is optional except packs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub packs: Vec<StandardPack>,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub rules: Vec<EvidenceRule>,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default)]
    pub links: Vec<EvidenceLink>,
    #[serde(default)]
    pub verifications: Vec<Verification>,
    #[serde(default)]
    pub notes: Vec<ControlNote>,
}

impl Dataset {
    /// Load and parse a dataset file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading dataset file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing dataset file {}", path.display()))
    }

    /// Seed a service's registry with this dataset's records.
    ///
    /// Records go straight into the stores: the dataset is a snapshot of
    /// state that already passed validation when it was first written, and
    /// published packs must load as-is.
    pub fn seed(&self, service: &ComplianceService) {
        let registry = service.registry();
        for pack in &self.packs {
            registry.packs.insert(*pack.id.as_uuid(), pack.clone());
        }
        for control in &self.controls {
            registry.controls.insert(*control.id.as_uuid(), control.clone());
        }
        for rule in &self.rules {
            registry.rules.insert(*rule.id.as_uuid(), rule.clone());
        }
        for item in &self.evidence {
            registry.evidence.insert(*item.id.as_uuid(), item.clone());
        }
        for link in &self.links {
            registry.links.insert(*link.id.as_uuid(), link.clone());
        }
        for verification in &self.verifications {
            registry
                .verifications
                .insert(*verification.id.as_uuid(), verification.clone());
        }
        for note in &self.notes {
            registry.notes.insert(*note.id.as_uuid(), note.clone());
        }
    }

    /// Pick the pack to operate on: an explicit version, or the most
    /// recently created one.
    pub fn select_pack(&self, version: Option<&str>) -> anyhow::Result<&StandardPack> {
        match version {
            Some(v) => self
                .packs
                .iter()
                .find(|p| p.version == v)
                .with_context(|| format!("no pack with version {v} in dataset")),
            None => self
                .packs
                .iter()
                .max_by_key(|p| p.created_at)
                .context("dataset contains no packs"),
        }
    }
}
