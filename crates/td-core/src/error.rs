//! Shared error taxonomy for the discovery substrate.
//!
//! Every fallible operation across `td-*` crates returns `Result<T, Error>`
//! (or a crate-local error that converts into it via `#[from]`), following
//! the error-kind-per-variant discipline in the spec rather than
//! string-typed failures.

use std::fmt;

/// Error kinds surfaced across the catalog/search/loader/controller boundary.
///
/// `Clone` so the loader can hand the same error to every co-awaiter of a
/// coalesced in-flight load.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("source '{0}' is already registered")]
    SourceAlreadyRegistered(String),

    #[error("failed to resolve tool from source '{source_id}': {cause}")]
    SourceResolveFailed { source_id: String, cause: String },

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("tool not found: {id}{}", detail.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
    ToolNotFound { id: String, detail: Option<String> },

    #[error("search index is not ready (call index() first)")]
    IndexNotReady,

    #[error("indexing failed: {0}")]
    IndexingFailed(String),

    #[error("invalid search mode: {0}")]
    InvalidSearchMode(String),

    #[error("tool execution failed: {tool_name}: {cause}")]
    ToolExecutionFailed { tool_name: String, cause: String },

    #[error("operation cancelled by caller")]
    CancelledByCaller,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn tool_not_found(id: impl Into<String>) -> Self {
        Error::ToolNotFound {
            id: id.into(),
            detail: None,
        }
    }

    pub fn tool_not_found_detail(id: impl Into<String>, detail: impl fmt::Display) -> Self {
        Error::ToolNotFound {
            id: id.into(),
            detail: Some(detail.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_renders_detail_when_present() {
        let e = Error::tool_not_found_detail("src:x", "source returned empty");
        assert_eq!(
            e.to_string(),
            "tool not found: src:x (source returned empty)"
        );
    }

    #[test]
    fn tool_not_found_omits_detail_when_absent() {
        let e = Error::tool_not_found("src:x");
        assert_eq!(e.to_string(), "tool not found: src:x");
    }
}
