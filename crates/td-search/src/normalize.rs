//! Score normalization helpers shared by the lexical and vector retrievers.

/// Min-max normalize a set of raw scores to `[0, 1]`.
///
/// Empty input returns empty output. When every score is equal (including
/// the singleton case), every output becomes `1.0` rather than dividing by
/// zero.
pub fn min_max_normalize(scores: &[(String, f32)]) -> Vec<(String, f32)> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = scores
        .iter()
        .map(|(_, s)| *s)
        .fold(f32::NEG_INFINITY, f32::max);

    if max > min {
        scores
            .iter()
            .map(|(id, s)| (id.clone(), (s - min) / (max - min)))
            .collect()
    } else {
        scores.iter().map(|(id, _)| (id.clone(), 1.0)).collect()
    }
}

/// Per-item sigmoid normalization, useful when no result-set context is
/// available to min-max against. Diagnostics only — `SearchIndex::search`
/// always uses [`min_max_normalize`] for its returned scores.
pub fn sigmoid_normalize(score: f32, k: f32) -> f32 {
    1.0 / (1.0 + (-(score - k) / k).exp())
}
