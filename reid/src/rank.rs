//! Candidate ranking by cosine similarity.
//!
//! Pure; no error conditions. An empty candidate set yields an empty
//! result.

use crate::aggregate::l2_normalize;

/// One scored candidate at full precision. Rounding to four decimals
/// happens only at the presentation boundary (see [`round4`]).
#[derive(Debug, Clone)]
pub struct Scored {
    pub id: String,
    pub score: f32,
}

/// Score `query` against `candidates`, keep those at or above `threshold`,
/// sort descending, and cut off at `max_results`.
///
/// Candidate vectors are defensively re-normalized before scoring, since
/// persisted vectors are expected but not guaranteed to be unit length.
/// The sort is stable, so equal scores keep their input order.
pub fn rank(
    query: &[f32],
    candidates: impl IntoIterator<Item = (String, Vec<f32>)>,
    threshold: f32,
    max_results: usize,
) -> Vec<Scored> {
    let mut passed: Vec<Scored> = Vec::new();
    for (id, mut vec) in candidates {
        l2_normalize(&mut vec);
        let score = dot_unit(query, &vec);
        if score >= threshold {
            passed.push(Scored { id, score });
        }
    }
    passed.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    passed.truncate(max_results);
    passed
}

/// Dot product of two unit vectors (cosine similarity, range [-1, 1]).
///
/// Accumulates in f64 and clamps against floating point drift. Dimension
/// mismatches score over the shared prefix.
pub fn dot_unit(a: &[f32], b: &[f32]) -> f32 {
    let mut dot: f64 = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
    }
    dot.clamp(-1.0, 1.0) as f32
}

/// Round a similarity to four decimal digits for external presentation.
pub fn round4(score: f32) -> f32 {
    ((score as f64 * 10_000.0).round() / 10_000.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidates_empty_result() {
        let out = rank(&[1.0, 0.0], Vec::new(), 0.5, 10);
        assert!(out.is_empty());
    }

    #[test]
    fn worked_example_threshold_filter() {
        // query = [0.7071, 0.7071]
        let query = [0.7071, 0.7071];
        let candidates = vec![
            ("c".to_string(), vec![0.7071, 0.7071]),
            ("d".to_string(), vec![-1.0, 0.0]),
        ];
        let out = rank(&query, candidates, 0.9, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "c");
        assert!((out[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn every_result_meets_threshold_and_order_is_non_increasing() {
        let query = [1.0, 0.0, 0.0];
        let candidates = vec![
            ("far".to_string(), vec![0.0, 1.0, 0.0]),
            ("close".to_string(), vec![0.98, 0.2, 0.0]),
            ("closer".to_string(), vec![1.0, 0.01, 0.0]),
            ("opposite".to_string(), vec![-1.0, 0.0, 0.0]),
        ];
        let out = rank(&query, candidates, 0.5, 10);
        assert_eq!(out.len(), 2);
        for s in &out {
            assert!(s.score >= 0.5);
        }
        for pair in out.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(out[0].id, "closer");
    }

    #[test]
    fn truncated_to_max_results() {
        let query = [1.0, 0.0];
        let candidates: Vec<(String, Vec<f32>)> = (0..10)
            .map(|i| (format!("c{i}"), vec![1.0, 0.001 * i as f32]))
            .collect();
        let out = rank(&query, candidates, 0.0, 3);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let query = [1.0, 0.0];
        let candidates = vec![
            ("first".to_string(), vec![1.0, 0.0]),
            ("second".to_string(), vec![2.0, 0.0]), // same direction, normalized equal
            ("third".to_string(), vec![0.5, 0.0]),
        ];
        let out = rank(&query, candidates, 0.5, 10);
        let ids: Vec<&str> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn candidates_are_renormalized_before_scoring() {
        let query = [1.0, 0.0];
        // Stored at twice unit length; cosine must still be 1.0.
        let out = rank(&query, vec![("c".to_string(), vec![2.0, 0.0])], 0.99, 10);
        assert_eq!(out.len(), 1);
        assert!((out[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn round4_presentation() {
        assert_eq!(round4(0.70716), 0.7072);
        assert_eq!(round4(-0.70714), -0.7071);
        assert_eq!(round4(1.0), 1.0);
    }
}
