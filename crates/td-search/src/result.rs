//! Query options and result shapes returned by [`crate::SearchIndex::search`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use td_core::config::{default_search_limit, SearchMode};

/// Which retrieval path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    Lexical,
    Vector,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Normalized to `[0, 1]`.
    pub score: f32,
    pub origin: MatchOrigin,
}

#[derive(Debug, Clone)]
pub struct SearchOpts {
    pub limit: usize,
    pub threshold: f32,
    pub categories: Option<BTreeSet<String>>,
    /// Override of the index's constructor mode for this query only.
    pub mode: Option<SearchMode>,
}

impl Default for SearchOpts {
    fn default() -> Self {
        Self {
            limit: default_search_limit(),
            threshold: 0.0,
            categories: None,
            mode: None,
        }
    }
}
