//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier namespace in AccrediVault. The
//! type-level distinction prevents cross-namespace confusion — you cannot
//! pass an `EvidenceId` where a `ControlId` is expected, which matters in a
//! system whose audit trail records entity ids as opaque strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl<'s> utoipa::ToSchema<'s> for $name {
            fn schema() -> (&'s str, utoipa::openapi::RefOr<utoipa::openapi::Schema>) {
                (
                    stringify!($name),
                    utoipa::openapi::ObjectBuilder::new()
                        .schema_type(utoipa::openapi::SchemaType::String)
                        .format(Some(utoipa::openapi::SchemaFormat::KnownFormat(
                            utoipa::openapi::KnownFormat::Uuid,
                        )))
                        .into(),
                )
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a standard pack (a published checklist version).
    PackId
);
uuid_id!(
    /// Unique identifier for a control (a single checklist requirement).
    ControlId
);
uuid_id!(
    /// Unique identifier for an evidence item.
    EvidenceId
);
uuid_id!(
    /// Unique identifier for a file attached to an evidence item.
    EvidenceFileId
);
uuid_id!(
    /// Unique identifier for a control ↔ evidence link.
    LinkId
);
uuid_id!(
    /// Unique identifier for an evidence-sufficiency rule.
    RuleId
);
uuid_id!(
    /// Unique identifier for a verification decision.
    VerificationId
);
uuid_id!(
    /// Unique identifier for a compliance alert.
    AlertId
);
uuid_id!(
    /// Unique identifier for a control note.
    NoteId
);
uuid_id!(
    /// Unique identifier for an export job.
    ExportJobId
);
