//! Cosine similarity ranking.

use std::cmp::Ordering;

/// Stabilizer added to the cosine denominator so zero vectors score 0.
pub const COSINE_EPSILON: f64 = 1e-8;

/// A ranked candidate with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    /// Candidate payload.
    pub item: T,
    /// Cosine similarity against the query.
    pub score: f32,
}

/// Cosine similarity `dot(a, b) / (|a| * |b| + eps)`.
///
/// Vectors of different length are compared over their shared prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt() + COSINE_EPSILON)) as f32
}

/// Score every candidate against `query` and keep the best `k`.
///
/// The sort is stable, so candidates with equal scores keep their input order.
pub fn rank_top_k<'a, T, I>(query: &[f32], candidates: I, k: usize) -> Vec<Ranked<T>>
where
    I: IntoIterator<Item = (T, &'a [f32])>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<Ranked<T>> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let score = cosine_similarity(query, vector);
            Ranked {
                item,
                score: if score.is_nan() { f32::NEG_INFINITY } else { score },
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
