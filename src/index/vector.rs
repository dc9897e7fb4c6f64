//! Vector similarity

use std::cmp::Ordering;

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine similarity, `None` when the dimensions differ or a vector is empty
pub fn checked_cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    Some(cosine_similarity(a, b))
}

/// An item with its similarity to a query
#[derive(Debug, Clone)]
pub struct ScoredItem<T> {
    pub item: T,
    pub score: f32,
}

/// Rank `items` by similarity of their vector to `query`, best first,
/// keeping at most `top_k`.
pub fn rank_by_similarity<T, F>(query: &[f32], items: Vec<T>, vector_of: F, top_k: usize) -> Vec<ScoredItem<T>>
where
    F: Fn(&T) -> &[f32],
{
    let mut scored: Vec<ScoredItem<T>> = items
        .into_iter()
        .map(|item| {
            let score = cosine_similarity(query, vector_of(&item));
            ScoredItem { item, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn test_checked_cosine_dimension_mismatch() {
        assert_eq!(checked_cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
        assert_eq!(checked_cosine_similarity(&[], &[]), None);
        assert_eq!(checked_cosine_similarity(&[0.0, 2.0], &[0.0, 3.0]), Some(1.0));
    }

    #[test]
    fn test_cosine_similarity_identity() {
        for v in [vec![1.0, 0.0, 0.0], vec![0.3, -2.5, 7.0], vec![1e-3, 1e-3]] {
            assert!((cosine_similarity(&v, &v) - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let c = vec![-1.0, 0.0, 0.0];

        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert!((cosine_similarity(&a, &c) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_by_similarity() {
        let items = vec![
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("exact", vec![1.0, 0.0]),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], items, |(_, v)| v.as_slice(), 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item.0, "exact");
        assert_eq!(ranked[1].item.0, "near");
    }
}
