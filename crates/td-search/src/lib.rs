//! Hybrid lexical/semantic retrieval over a catalog's descriptor snapshot.

pub mod fusion;
pub mod index;
pub mod lexical;
pub mod normalize;
pub mod result;
pub mod vector;

pub use index::SearchIndex;
pub use result::{MatchOrigin, SearchOpts, SearchResult};
pub use vector::{cosine_similarity, Embedder, EmbeddingCache, EmbeddingsRequest, EmbeddingsResponse};
