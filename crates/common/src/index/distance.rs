//! Similarity metrics
//!
//! Every metric is expressed as a similarity: larger means closer.

use serde::{Deserialize, Serialize};

/// Similarity metric, fixed when the index is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    InnerProduct,
    /// Negated L2 distance
    Euclidean,
}

impl Metric {
    /// Score `candidate` against `query`; both must have the same length
    pub fn similarity(&self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(query, candidate),
            Metric::InnerProduct => dot(query, candidate),
            Metric::Euclidean => -euclidean_distance_squared(query, candidate).sqrt(),
        }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let ma = magnitude(a);
    let mb = magnitude(b);
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (ma * mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_euclidean_is_negated_distance() {
        let near = Metric::Euclidean.similarity(&[0.0, 0.0], &[1.0, 0.0]);
        let far = Metric::Euclidean.similarity(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((far + 5.0).abs() < 1e-6);
        assert!(near > far);
    }

    #[test]
    fn test_inner_product_ignores_norm() {
        assert_eq!(Metric::InnerProduct.similarity(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
    }
}
