//! Configuration knobs for search, loader and controller, following the
//! teacher workspace's convention of one small `Default`-able struct per
//! configurable subsystem rather than a single monolithic options blob.

use serde::{Deserialize, Serialize};

/// Per-field BM25 boost factors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBoosts {
    #[serde(default = "d_name_boost")]
    pub name: f32,
    #[serde(default = "d_keywords_boost")]
    pub keywords: f32,
    #[serde(default = "d_description_boost")]
    pub description: f32,
    #[serde(default = "d_categories_boost")]
    pub categories: f32,
}

fn d_name_boost() -> f32 {
    2.0
}
fn d_keywords_boost() -> f32 {
    1.5
}
fn d_description_boost() -> f32 {
    1.0
}
fn d_categories_boost() -> f32 {
    1.0
}

impl Default for FieldBoosts {
    fn default() -> Self {
        Self {
            name: d_name_boost(),
            keywords: d_keywords_boost(),
            description: d_description_boost(),
            categories: d_categories_boost(),
        }
    }
}

/// Search index mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Lexical,
    Vector,
    Hybrid,
}

/// Hybrid fusion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    WeightedScore,
    ReciprocalRank,
}

impl Default for FusionMethod {
    fn default() -> Self {
        FusionMethod::WeightedScore
    }
}

/// Weights applied to each mode's normalized score during weighted-score
/// fusion. Both must be non-negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionWeights {
    #[serde(default = "d_fusion_weight")]
    pub lexical: f32,
    #[serde(default = "d_fusion_weight")]
    pub vector: f32,
}

fn d_fusion_weight() -> f32 {
    0.5
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: d_fusion_weight(),
            vector: d_fusion_weight(),
        }
    }
}

/// `k` constant for reciprocal-rank fusion.
fn d_rrf_k() -> u32 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub mode: SearchMode,
    #[serde(default)]
    pub boosts: FieldBoosts,
    #[serde(default)]
    pub fusion_method: FusionMethod,
    #[serde(default)]
    pub fusion_weights: FusionWeights,
    #[serde(default = "d_rrf_k")]
    pub rrf_k: u32,
    /// BM25 term-frequency saturation constant.
    #[serde(default = "d_bm25_k1")]
    pub bm25_k1: f32,
    /// BM25 length-normalization constant.
    #[serde(default = "d_bm25_b")]
    pub bm25_b: f32,
    /// Fixed embedding dimension, required when `mode` uses vectors.
    #[serde(default)]
    pub vector_dim: Option<usize>,
}

fn d_bm25_k1() -> f32 {
    1.2
}
fn d_bm25_b() -> f32 {
    0.75
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Lexical,
            boosts: FieldBoosts::default(),
            fusion_method: FusionMethod::default(),
            fusion_weights: FusionWeights::default(),
            rrf_k: d_rrf_k(),
            bm25_k1: d_bm25_k1(),
            bm25_b: d_bm25_b(),
            vector_dim: None,
        }
    }
}

/// Default query result limit.
pub fn default_search_limit() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "d_loader_max_size")]
    pub max_size: usize,
    /// Time-to-live for cached entries; `None` disables expiry.
    #[serde(default)]
    pub ttl: Option<std::time::Duration>,
}

fn d_loader_max_size() -> usize {
    100
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_size: d_loader_max_size(),
            ttl: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "d_search_limit")]
    pub search_limit: usize,
    /// Safety bound on the number of model↔tool round-trips within one
    /// `run` call, mirroring the teacher runtime's `MAX_TOOL_LOOPS` guard.
    #[serde(default = "d_max_turn_loops")]
    pub max_turn_loops: usize,
}

fn d_search_limit() -> usize {
    default_search_limit()
}
fn d_max_turn_loops() -> usize {
    25
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            search_limit: d_search_limit(),
            max_turn_loops: d_max_turn_loops(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_boosts_defaults_match_spec() {
        let b = FieldBoosts::default();
        assert_eq!(b.name, 2.0);
        assert_eq!(b.keywords, 1.5);
        assert_eq!(b.description, 1.0);
        assert_eq!(b.categories, 1.0);
    }

    #[test]
    fn loader_config_default_capacity_is_100() {
        assert_eq!(LoaderConfig::default().max_size, 100);
    }
}
