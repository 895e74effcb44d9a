//! Artifact renderers. The output format is behind a trait so a PDF or
//! archive renderer can slot in later; the shipped renderer emits canonical
//! JSON (RFC 8785), which keeps the artifact byte-reproducible.

use av_core::{AvError, CanonicalBytes};

use crate::snapshot::ExportSnapshot;

/// Serializes a snapshot into final artifact bytes.
pub trait ArtifactRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, snapshot: &ExportSnapshot) -> Result<Vec<u8>, AvError>;
}

/// Canonical JSON renderer: the artifact is the JCS serialization of the
/// snapshot, so its hash is a pure function of the snapshot data.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalJsonRenderer;

impl ArtifactRenderer for CanonicalJsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, snapshot: &ExportSnapshot) -> Result<Vec<u8>, AvError> {
        let canonical = CanonicalBytes::new(snapshot)?;
        Ok(canonical.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ExportSnapshot {
        ExportSnapshot {
            authority_code: "PHC".to_string(),
            pack_name: "Lab Licensing".to_string(),
            pack_version: "1.0".to_string(),
            scope: "FULL_PACK".to_string(),
            as_of_date: "2026-06-01".parse().unwrap(),
            controls: vec![],
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = CanonicalJsonRenderer;
        assert_eq!(r.render(&snapshot()).unwrap(), r.render(&snapshot()).unwrap());
    }

    #[test]
    fn test_rendered_bytes_are_valid_json() {
        let bytes = CanonicalJsonRenderer.render(&snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["authority_code"], "PHC");
    }
}
