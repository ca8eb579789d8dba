//! Vector retrieval: an injected [`Embedder`], a cosine-similarity index,
//! and an embedding cache keyed by descriptor id.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use td_core::descriptor::ToolDescriptor;
use td_core::Error;

/// A batch embedding request, field-compatible with an `LlmProvider`'s
/// `embeddings()` call so a real provider can back this trait directly.
#[derive(Debug, Clone)]
pub struct EmbeddingsRequest {
    pub input: Vec<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingsResponse {
    pub embeddings: Vec<Vec<f32>>,
}

/// Batched text-to-vector embedder. Implementations MUST return one vector
/// per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, request: EmbeddingsRequest) -> Result<EmbeddingsResponse, Error>;
}

/// Cosine similarity in `[-1, 1]`. Returns `0.0` on dimension mismatch or a
/// zero-magnitude vector rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(len_a = a.len(), len_b = b.len(), "cosine_similarity: mismatched vector lengths");
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Map a raw similarity into `[0, 1]`: values already in range are
/// clamped, values in `[-1, 1]` are rescaled.
fn normalize_similarity(raw: f32) -> f32 {
    if (0.0..=1.0).contains(&raw) {
        raw
    } else {
        ((raw + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

/// LRU cache from descriptor id to its embedding, decoupled from index
/// lifetime — a reindex reuses cached vectors for ids it already holds.
pub struct EmbeddingCache {
    inner: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, id: &str) -> Option<Vec<f32>> {
        self.inner.lock().get(id).cloned()
    }

    pub fn put(&self, id: String, vector: Vec<f32>) {
        self.inner.lock().put(id, vector);
    }

    pub fn invalidate(&self, id: &str) {
        self.inner.lock().pop(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Similarity floor applied before normalization, filtering out
/// near-orthogonal matches that would otherwise dilute a min-max pass.
pub const VECTOR_SIMILARITY_FLOOR: f32 = 0.3;

/// Cosine-similarity index over a fixed snapshot of (id, embedding) pairs.
pub struct VectorIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl VectorIndex {
    /// Build the index, consulting `cache` for each descriptor and calling
    /// `embedder` once (batched) for every cache miss. On embedder failure
    /// no entries are written back to `cache`, so a prior index is left
    /// untouched by the caller.
    pub async fn build(
        descriptors: &[ToolDescriptor],
        embedder: &Arc<dyn Embedder>,
        cache: &EmbeddingCache,
    ) -> Result<Self, Error> {
        let mut entries = Vec::with_capacity(descriptors.len());
        let mut misses = Vec::new();

        for descriptor in descriptors {
            match cache.get(&descriptor.id) {
                Some(vector) => entries.push((descriptor.id.clone(), vector)),
                None => misses.push(descriptor),
            }
        }

        if !misses.is_empty() {
            let request = EmbeddingsRequest {
                input: misses.iter().map(|d| d.embedding_text()).collect(),
                model: None,
            };
            let response = embedder
                .embed(request)
                .await
                .map_err(|e| Error::IndexingFailed(e.to_string()))?;
            if response.embeddings.len() != misses.len() {
                return Err(Error::IndexingFailed(format!(
                    "embedder returned {} vectors for {} inputs",
                    response.embeddings.len(),
                    misses.len()
                )));
            }
            for (descriptor, vector) in misses.into_iter().zip(response.embeddings.into_iter()) {
                cache.put(descriptor.id.clone(), vector.clone());
                entries.push((descriptor.id.clone(), vector));
            }
        }

        Ok(Self { entries })
    }

    /// Nearest-neighbor scores against `query_vector`, normalized to
    /// `[0, 1]`, with matches under [`VECTOR_SIMILARITY_FLOOR`] dropped.
    pub fn score(&self, query_vector: &[f32]) -> Vec<(String, f32)> {
        self.entries
            .iter()
            .filter_map(|(id, vector)| {
                let raw = cosine_similarity(query_vector, vector);
                if raw < VECTOR_SIMILARITY_FLOOR {
                    None
                } else {
                    Some((id.clone(), normalize_similarity(raw)))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn embedding_cache_roundtrips_and_invalidates() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".into(), vec![1.0]);
        assert_eq!(cache.get("a"), Some(vec![1.0]));
        cache.invalidate("a");
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn vector_index_score_drops_matches_under_floor() {
        let index = VectorIndex {
            entries: vec![
                ("close".to_string(), vec![1.0, 0.0]),
                ("far".to_string(), vec![0.0, 1.0]),
            ],
        };
        let scores = index.score(&[1.0, 0.1]);
        assert!(scores.iter().any(|(id, _)| id == "close"));
        assert!(!scores.iter().any(|(id, _)| id == "far"));
    }
}
