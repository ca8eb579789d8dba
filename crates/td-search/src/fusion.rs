//! Hybrid fusion strategies combining a lexical and a vector result set,
//! each already normalized to `[0, 1]` by its own retriever.

use std::collections::HashMap;

use td_core::config::FusionWeights;

use crate::normalize::min_max_normalize;

/// `score(i) = (w_lex·s_lex(i) if present) + (w_vec·s_vec(i) if present)`,
/// divided by the weight actually applied — an id present in only one set
/// isn't penalized beyond the missing weight.
pub fn weighted_score_fusion(
    lexical: &[(String, f32)],
    vector: &[(String, f32)],
    weights: FusionWeights,
) -> Vec<(String, f32)> {
    let lex_map: HashMap<&str, f32> = lexical.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    let vec_map: HashMap<&str, f32> = vector.iter().map(|(id, s)| (id.as_str(), *s)).collect();

    let mut ids: Vec<&str> = lex_map.keys().chain(vec_map.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .map(|id| {
            let mut numerator = 0.0f32;
            let mut denominator = 0.0f32;
            if let Some(score) = lex_map.get(id) {
                numerator += score * weights.lexical;
                denominator += weights.lexical;
            }
            if let Some(score) = vec_map.get(id) {
                numerator += score * weights.vector;
                denominator += weights.vector;
            }
            let score = if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            };
            (id.to_string(), score)
        })
        .collect()
}

/// Rank each mode's result set descending by score (ties broken by id, for
/// determinism), then `score(i) = Σ 1/(k + rank_mode(i))` over the modes
/// `i` appears in. The raw RRF scores are finally min-max normalized.
pub fn reciprocal_rank_fusion(
    lexical: &[(String, f32)],
    vector: &[(String, f32)],
    k: u32,
) -> Vec<(String, f32)> {
    let mut raw: HashMap<String, f32> = HashMap::new();
    for ranked in [ranked_by_score(lexical), ranked_by_score(vector)] {
        for (rank, id) in ranked.into_iter().enumerate() {
            let contribution = 1.0 / (k as f32 + (rank + 1) as f32);
            *raw.entry(id).or_insert(0.0) += contribution;
        }
    }
    let raw: Vec<(String, f32)> = raw.into_iter().collect();
    min_max_normalize(&raw)
}

fn ranked_by_score(scores: &[(String, f32)]) -> Vec<String> {
    let mut sorted: Vec<(String, f32)> = scores.to_vec();
    sorted.sort_by(|(id_a, score_a), (id_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
    sorted.into_iter().map(|(id, _)| id).collect()
}
