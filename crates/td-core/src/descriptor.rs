//! Tool descriptor — the searchable, immutable metadata record for a tool.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Tag identifying which kind of [`crate::source::Source`] produced a
/// descriptor. A fixed, closed enumeration rather than an open trait
/// hierarchy — the set of source kinds is small and known ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    InMemory,
    Remote,
    Lazy,
}

/// Immutable metadata record for a single tool.
///
/// Constructed once (by a [`crate::source::Source`]) and never mutated in
/// place; a descriptor whose underlying tool changed is replaced wholesale,
/// not patched. `parameters` is treated as opaque JSON-Schema-shaped data —
/// the core never validates or transforms it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Globally unique id, conventionally `<sourceId>:<localName>`.
    pub id: String,
    /// Human/model-visible name. Not required to be globally unique.
    pub name: String,
    /// Non-empty free-text description.
    pub description: String,
    /// Structural schema for accepted inputs (opaque to the core).
    pub parameters: serde_json::Value,
    /// Optional category tags, used only for search boosting/filtering.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Optional keyword tags, used only for search boosting.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    pub source_kind: SourceKind,
    /// Id of the owning source within its catalog.
    pub source_id: String,
}

impl ToolDescriptor {
    /// Text used to build the lexical/vector embedding document: name,
    /// description, keywords, and categories concatenated space-separated,
    /// in that order.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.name.as_str(), self.description.as_str()];
        let keywords = self.keywords.iter().map(String::as_str).collect::<Vec<_>>();
        let categories = self
            .categories
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();
        let keywords_joined = keywords.join(" ");
        let categories_joined = categories.join(" ");
        if !keywords_joined.is_empty() {
            parts.push(&keywords_joined);
        }
        if !categories_joined.is_empty() {
            parts.push(&categories_joined);
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> ToolDescriptor {
        ToolDescriptor {
            id: "local:github_create_pr".into(),
            name: "github_create_pr".into(),
            description: "Create a pull request on GitHub".into(),
            parameters: serde_json::json!({"type": "object"}),
            categories: BTreeSet::from(["vcs".to_string()]),
            keywords: BTreeSet::from(["PR".to_string(), "merge".to_string()]),
            source_kind: SourceKind::InMemory,
            source_id: "local".into(),
        }
    }

    #[test]
    fn embedding_text_concatenates_all_fields() {
        let text = d().embedding_text();
        assert!(text.contains("github_create_pr"));
        assert!(text.contains("Create a pull request"));
        assert!(text.contains("PR"));
        assert!(text.contains("vcs"));
    }

    #[test]
    fn embedding_text_skips_empty_optional_fields() {
        let mut desc = d();
        desc.categories.clear();
        desc.keywords.clear();
        let text = desc.embedding_text();
        assert_eq!(text, "github_create_pr Create a pull request on GitHub");
    }
}
