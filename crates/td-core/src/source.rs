//! The `Source` contract — uniform capability every tool provider exposes.
//!
//! Concrete variants (in-memory, remote-protocol, lazy) live in the
//! `td-sources` crate; this module only fixes the contract the catalog and
//! loader depend on.

use async_trait::async_trait;

use crate::descriptor::ToolDescriptor;
use crate::error::Error;
use crate::event::EventChannel;
use crate::tool::SharedTool;

/// A provider of descriptors and executables sharing a common origin.
///
/// `get_descriptors` MAY be cached by the implementation within a refresh
/// epoch. `get_tool` accepts either the fully-qualified id or a bare local
/// name and returns `Ok(None)` (never an error) for an unknown id; failures
/// of the underlying resolution propagate as `Error::SourceResolveFailed`.
#[async_trait]
pub trait Source: Send + Sync {
    /// Id of this source, unique within a catalog.
    fn id(&self) -> &str;

    /// Current descriptor snapshot.
    async fn get_descriptors(&self) -> Result<Vec<ToolDescriptor>, Error>;

    /// Resolve a descriptor id (qualified or bare local name) to an
    /// executable, or `None` if unknown.
    async fn get_tool(&self, id: &str) -> Result<Option<SharedTool>, Error>;

    /// Refresh notification stream. Payloads are the new *complete*
    /// descriptor list; a source MUST only emit when the list changed.
    /// `None` means this source never refreshes.
    fn refresh_channel(&self) -> Option<&EventChannel<Vec<ToolDescriptor>>> {
        None
    }
}

/// Strip the `<sourceId>:` qualifier from an id, if present and matching.
pub fn strip_source_prefix<'a>(source_id: &str, id: &'a str) -> &'a str {
    id.strip_prefix(source_id)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_source_prefix_removes_matching_qualifier() {
        assert_eq!(strip_source_prefix("local", "local:github_create_pr"), "github_create_pr");
    }

    #[test]
    fn strip_source_prefix_passes_through_bare_name() {
        assert_eq!(strip_source_prefix("local", "github_create_pr"), "github_create_pr");
    }

    #[test]
    fn strip_source_prefix_ignores_foreign_qualifier() {
        assert_eq!(strip_source_prefix("local", "other:tool"), "other:tool");
    }
}
