use serde::{Deserialize, Serialize};

/// Similarity used to rank index entries. Scores are always "higher is better".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
}

impl Metric {
    /// NaN inputs rank last.
    pub fn score(self, query: &[f32], candidate: &[f32]) -> f64 {
        let s = match self {
            Metric::Cosine => cosine_similarity(query, candidate),
            Metric::Euclidean => -euclidean_distance(query, candidate),
        };
        if s.is_nan() { f64::NEG_INFINITY } else { s }
    }
}

/// Cosine similarity accumulated in f64. A zero-norm side scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
