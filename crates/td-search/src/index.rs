//! Ties the lexical and vector retrievers together behind one `search`
//! entry point, handling mode selection, fusion, and result shaping.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use td_core::config::{FusionMethod, SearchConfig, SearchMode};
use td_core::descriptor::ToolDescriptor;
use td_core::Error;

use crate::fusion::{reciprocal_rank_fusion, weighted_score_fusion};
use crate::lexical::LexicalIndex;
use crate::normalize::min_max_normalize;
use crate::result::{MatchOrigin, SearchOpts, SearchResult};
use crate::vector::{Embedder, EmbeddingCache, EmbeddingsRequest, VectorIndex};

/// Capacity of the embedding cache backing vector/hybrid mode. Not exposed
/// via [`SearchConfig`] — cache lifetime is decoupled from indexing, so
/// it's sized generously rather than tuned per query workload.
const EMBEDDING_CACHE_CAPACITY: usize = 4096;

struct IndexState {
    snapshot: Arc<HashMap<String, ToolDescriptor>>,
    last_descriptors: Vec<ToolDescriptor>,
    lexical: Option<Arc<LexicalIndex>>,
    vector: Option<Arc<VectorIndex>>,
}

/// Hybrid lexical/semantic retrieval layer. Holds the last indexed
/// snapshot and, for vector/hybrid modes, an embedding cache keyed by
/// descriptor id whose lifetime survives a `reindex`.
pub struct SearchIndex {
    mode: SearchMode,
    config: SearchConfig,
    embedder: Option<Arc<dyn Embedder>>,
    embedding_cache: EmbeddingCache,
    state: RwLock<IndexState>,
}

impl SearchIndex {
    /// `config.mode` fixes the index's mode for its lifetime; per-query
    /// overrides are still possible via `SearchOpts.mode`.
    pub fn new(config: SearchConfig, embedder: Option<Arc<dyn Embedder>>) -> Result<Self, Error> {
        let mode = config.mode;
        if matches!(mode, SearchMode::Vector | SearchMode::Hybrid) && embedder.is_none() {
            return Err(Error::Config("vector/hybrid mode requires an embedder".to_string()));
        }
        Ok(Self {
            mode,
            config,
            embedder,
            embedding_cache: EmbeddingCache::new(EMBEDDING_CACHE_CAPACITY),
            state: RwLock::new(IndexState {
                snapshot: Arc::new(HashMap::new()),
                last_descriptors: Vec::new(),
                lexical: None,
                vector: None,
            }),
        })
    }

    /// Replace the index wholesale. On embedder failure during vector
    /// build, nothing is mutated — the prior index (if any) stands.
    pub async fn index(&self, descriptors: Vec<ToolDescriptor>) -> Result<(), Error> {
        let lexical = if matches!(self.mode, SearchMode::Lexical | SearchMode::Hybrid) {
            Some(Arc::new(LexicalIndex::build(
                &descriptors,
                self.config.bm25_k1,
                self.config.bm25_b,
                self.config.boosts.clone(),
            )))
        } else {
            None
        };

        let vector = if matches!(self.mode, SearchMode::Vector | SearchMode::Hybrid) {
            let embedder = self
                .embedder
                .as_ref()
                .expect("constructor guarantees an embedder for vector/hybrid mode");
            Some(Arc::new(
                VectorIndex::build(&descriptors, embedder, &self.embedding_cache).await?,
            ))
        } else {
            None
        };

        let snapshot: HashMap<String, ToolDescriptor> =
            descriptors.iter().map(|d| (d.id.clone(), d.clone())).collect();

        let mut state = self.state.write();
        state.snapshot = Arc::new(snapshot);
        state.last_descriptors = descriptors;
        state.lexical = lexical;
        state.vector = vector;
        Ok(())
    }

    /// Re-run `index` over the descriptor list from the last `index` call.
    pub async fn reindex(&self) -> Result<(), Error> {
        let descriptors = {
            let state = self.state.read();
            if state.lexical.is_none() && state.vector.is_none() {
                return Err(Error::IndexNotReady);
            }
            state.last_descriptors.clone()
        };
        self.index(descriptors).await
    }

    pub async fn search(&self, query: &str, opts: SearchOpts) -> Result<Vec<SearchResult>, Error> {
        let effective_mode = opts.mode.unwrap_or(self.mode);
        let (snapshot, lexical, vector) = {
            let state = self.state.read();
            if state.lexical.is_none() && state.vector.is_none() {
                return Err(Error::IndexNotReady);
            }
            (state.snapshot.clone(), state.lexical.clone(), state.vector.clone())
        };

        let scored = match effective_mode {
            SearchMode::Lexical => {
                let lexical = lexical.ok_or_else(|| Error::InvalidSearchMode("lexical index was not built".into()))?;
                min_max_normalize(&lexical.score(query))
            }
            SearchMode::Vector => {
                let vector = vector.ok_or_else(|| Error::InvalidSearchMode("vector index was not built".into()))?;
                let embedder = self
                    .embedder
                    .as_ref()
                    .ok_or_else(|| Error::InvalidSearchMode("vector mode requires an embedder".into()))?;
                let query_vector = embed_query(embedder, query).await?;
                min_max_normalize(&vector.score(&query_vector))
            }
            SearchMode::Hybrid => {
                let lexical = lexical.ok_or_else(|| Error::InvalidSearchMode("lexical index was not built".into()))?;
                let vector = vector.ok_or_else(|| Error::InvalidSearchMode("vector index was not built".into()))?;
                let embedder = self
                    .embedder
                    .as_ref()
                    .ok_or_else(|| Error::InvalidSearchMode("hybrid mode requires an embedder".into()))?;
                let top_n = opts.limit.saturating_mul(2).max(1);

                let lexical_future = async { min_max_normalize(&lexical.score(query)) };
                let vector_future = async {
                    let query_vector = embed_query(embedder, query).await?;
                    Ok::<_, Error>(min_max_normalize(&vector.score(&query_vector)))
                };
                let (lex_scores, vec_scores) = futures_util::future::join(lexical_future, vector_future).await;
                let vec_scores = vec_scores?;

                let lex_top = top_n_scores(lex_scores, top_n);
                let vec_top = top_n_scores(vec_scores, top_n);

                match self.config.fusion_method {
                    FusionMethod::WeightedScore => {
                        weighted_score_fusion(&lex_top, &vec_top, self.config.fusion_weights)
                    }
                    FusionMethod::ReciprocalRank => {
                        reciprocal_rank_fusion(&lex_top, &vec_top, self.config.rrf_k)
                    }
                }
            }
        };

        Ok(finalize(&snapshot, scored, &opts, origin_for(effective_mode)))
    }
}

fn origin_for(mode: SearchMode) -> MatchOrigin {
    match mode {
        SearchMode::Lexical => MatchOrigin::Lexical,
        SearchMode::Vector => MatchOrigin::Vector,
        SearchMode::Hybrid => MatchOrigin::Hybrid,
    }
}

async fn embed_query(embedder: &Arc<dyn Embedder>, query: &str) -> Result<Vec<f32>, Error> {
    let response = embedder
        .embed(EmbeddingsRequest {
            input: vec![query.to_string()],
            model: None,
        })
        .await
        .map_err(|e| Error::IndexingFailed(e.to_string()))?;
    response
        .embeddings
        .into_iter()
        .next()
        .ok_or_else(|| Error::IndexingFailed("embedder returned no vector for the query".into()))
}

fn top_n_scores(mut scores: Vec<(String, f32)>, top_n: usize) -> Vec<(String, f32)> {
    sort_desc(&mut scores);
    scores.truncate(top_n);
    scores
}

fn sort_desc(scores: &mut [(String, f32)]) {
    scores.sort_by(|(id_a, score_a), (id_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
}

fn finalize(
    snapshot: &HashMap<String, ToolDescriptor>,
    scored: Vec<(String, f32)>,
    opts: &SearchOpts,
    origin: MatchOrigin,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = scored
        .into_iter()
        .filter(|(_, score)| *score >= opts.threshold)
        .filter_map(|(id, score)| {
            let descriptor = snapshot.get(&id)?;
            if let Some(categories) = &opts.categories {
                if descriptor.categories.is_disjoint(categories) {
                    return None;
                }
            }
            Some(SearchResult {
                id: id.clone(),
                name: descriptor.name.clone(),
                description: descriptor.description.clone(),
                score,
                origin,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(opts.limit);
    results
}
