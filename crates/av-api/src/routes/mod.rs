//! # Route Modules
//!
//! One module per API domain, each exposing a `router()` that the
//! top-level `app` merges.

pub mod alerts;
pub mod audit;
pub mod controls;
pub mod evidence;
pub mod exports;

use serde::Deserialize;
use utoipa::ToSchema;

/// Pagination parameters shared by list endpoints.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl PaginationParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    pub(crate) fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    pub(crate) fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.effective_limit(), 100);
        assert_eq!(params.effective_offset(), 0);
    }

    #[test]
    fn test_pagination_limit_capped() {
        let params = PaginationParams {
            limit: Some(50_000),
            offset: None,
        };
        assert_eq!(params.effective_limit(), 1000);
    }
}
