//! Hand-rolled field-boosted BM25 lexical index.
//!
//! No full-text engine dependency — tokenization is a plain lowercase
//! Unicode-word split, and term statistics are kept per field so each
//! field's boost can be applied independently before summing.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use td_core::config::FieldBoosts;
use td_core::descriptor::ToolDescriptor;

const FIELD_COUNT: usize = 4;
const FIELD_NAME: usize = 0;
const FIELD_DESCRIPTION: usize = 1;
const FIELD_KEYWORDS: usize = 2;
const FIELD_CATEGORIES: usize = 3;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static pattern is valid"))
}

fn tokenize(text: &str) -> Vec<String> {
    token_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

struct Document {
    id: String,
    field_terms: [HashMap<String, u32>; FIELD_COUNT],
    field_len: [u32; FIELD_COUNT],
}

fn field_text(descriptor: &ToolDescriptor, field: usize) -> String {
    match field {
        FIELD_NAME => descriptor.name.clone(),
        FIELD_DESCRIPTION => descriptor.description.clone(),
        FIELD_KEYWORDS => descriptor
            .keywords
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
        FIELD_CATEGORIES => descriptor
            .categories
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
        _ => unreachable!("fixed field count"),
    }
}

fn boost_for(boosts: &FieldBoosts, field: usize) -> f32 {
    match field {
        FIELD_NAME => boosts.name,
        FIELD_DESCRIPTION => boosts.description,
        FIELD_KEYWORDS => boosts.keywords,
        FIELD_CATEGORIES => boosts.categories,
        _ => unreachable!("fixed field count"),
    }
}

/// BM25 index over a fixed snapshot of descriptors, rebuilt wholesale on
/// every `index`/`reindex` call.
pub struct LexicalIndex {
    k1: f32,
    b: f32,
    boosts: FieldBoosts,
    documents: Vec<Document>,
    doc_freq: HashMap<String, usize>,
    avg_field_len: [f32; FIELD_COUNT],
}

impl LexicalIndex {
    pub fn build(descriptors: &[ToolDescriptor], k1: f32, b: f32, boosts: FieldBoosts) -> Self {
        let mut documents = Vec::with_capacity(descriptors.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut field_len_sum = [0u64; FIELD_COUNT];

        for descriptor in descriptors {
            let mut field_terms: [HashMap<String, u32>; FIELD_COUNT] = Default::default();
            let mut field_len = [0u32; FIELD_COUNT];
            let mut seen_terms: std::collections::HashSet<String> = std::collections::HashSet::new();

            for field in 0..FIELD_COUNT {
                let tokens = tokenize(&field_text(descriptor, field));
                field_len[field] = tokens.len() as u32;
                field_len_sum[field] += tokens.len() as u64;
                for token in tokens {
                    *field_terms[field].entry(token.clone()).or_insert(0) += 1;
                    seen_terms.insert(token);
                }
            }

            for term in seen_terms {
                *doc_freq.entry(term).or_insert(0) += 1;
            }

            documents.push(Document {
                id: descriptor.id.clone(),
                field_terms,
                field_len,
            });
        }

        let n = documents.len().max(1) as f32;
        let mut avg_field_len = [0.0f32; FIELD_COUNT];
        for field in 0..FIELD_COUNT {
            avg_field_len[field] = field_len_sum[field] as f32 / n;
        }

        Self {
            k1,
            b,
            boosts,
            documents,
            doc_freq,
            avg_field_len,
        }
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.documents.len() as f32;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Raw BM25 scores for every document matching at least one query
    /// term. Documents with zero overlap are omitted, not scored as zero.
    pub fn score(&self, query: &str) -> Vec<(String, f32)> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<&str, f32> = HashMap::new();
        for document in &self.documents {
            let mut total = 0.0f32;
            for term in &terms {
                let idf = self.idf(term);
                for field in 0..FIELD_COUNT {
                    let tf = *document.field_terms[field].get(term).unwrap_or(&0) as f32;
                    if tf == 0.0 {
                        continue;
                    }
                    let dl = document.field_len[field] as f32;
                    let avgdl = self.avg_field_len[field].max(1.0);
                    let denom = tf + self.k1 * (1.0 - self.b + self.b * dl / avgdl);
                    let contribution = idf * (tf * (self.k1 + 1.0)) / denom;
                    total += contribution * boost_for(&self.boosts, field);
                }
            }
            if total > 0.0 {
                scores.insert(&document.id, total);
            }
        }

        scores.into_iter().map(|(id, s)| (id.to_string(), s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::SourceKind;

    fn d(id: &str, name: &str, description: &str, keywords: &[&str]) -> ToolDescriptor {
        ToolDescriptor {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({}),
            categories: Default::default(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            source_kind: SourceKind::InMemory,
            source_id: "local".into(),
        }
    }

    #[test]
    fn exact_name_match_outscores_incidental_description_mention() {
        let docs = vec![
            d("a", "create_pull_request", "Opens a PR on GitHub", &[]),
            d(
                "b",
                "list_files",
                "Lists files, occasionally used before a pull request",
                &[],
            ),
        ];
        let index = LexicalIndex::build(&docs, 1.2, 0.75, FieldBoosts::default());
        let scores = index.score("pull request");
        let score = |id: &str| scores.iter().find(|(i, _)| i == id).unwrap().1;
        assert!(score("a") > score("b"));
    }

    #[test]
    fn non_matching_query_returns_no_scores() {
        let docs = vec![d("a", "create_pull_request", "Opens a PR", &[])];
        let index = LexicalIndex::build(&docs, 1.2, 0.75, FieldBoosts::default());
        assert!(index.score("zzz_nonexistent_term").is_empty());
    }

    #[test]
    fn keyword_field_contributes_to_score() {
        let docs = vec![d("a", "misc_tool", "Does things", &["deploy", "kubernetes"])];
        let index = LexicalIndex::build(&docs, 1.2, 0.75, FieldBoosts::default());
        assert!(!index.score("kubernetes").is_empty());
    }
}
