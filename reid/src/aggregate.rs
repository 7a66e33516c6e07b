//! Embedding aggregation: many noisy per-photo vectors into one query
//! vector.
//!
//! Pure functions; identical inputs always produce identical outputs.

use strayid_embed::EmbedError;

/// Combine per-photo embedding attempts into one unit-length query vector.
///
/// Per-photo failures are tolerated, never fatal: only the successful
/// vectors participate. The result is their element-wise mean,
/// re-normalized to unit length. Two documented edge cases:
///
/// - zero successes: returns `None`, meaning "no embedding yet, retry
///   later" (absence, not an error);
/// - the mean has zero norm (e.g. two exactly opposite vectors): the
///   un-normalized zero vector is returned as-is.
pub fn aggregate(attempts: &[Result<Vec<f32>, EmbedError>]) -> Option<Vec<f32>> {
    let successes: Vec<&Vec<f32>> = attempts.iter().filter_map(|a| a.as_ref().ok()).collect();
    let first = successes.first()?;

    let dim = first.len();
    let mut mean = vec![0.0f64; dim];
    for vec in &successes {
        for (d, slot) in mean.iter_mut().enumerate() {
            if d < vec.len() {
                *slot += vec[d] as f64;
            }
        }
    }
    let n = successes.len() as f64;
    for slot in mean.iter_mut() {
        *slot /= n;
    }

    let norm = mean.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for slot in mean.iter_mut() {
            *slot /= norm;
        }
    }
    Some(mean.into_iter().map(|v| v as f32).collect())
}

/// L2-normalize `v` in place. A zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = ((*x as f64) / norm) as f32;
        }
    }
}
