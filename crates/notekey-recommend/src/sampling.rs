//! Candidate post-processing: exclusion filter and weighted down-selection.
//!
//! Raw candidates whose keyword the note already uses are dropped, then a
//! fixed number are drawn without replacement with probability proportional
//! to score. Higher scores are favored but every remaining candidate keeps a
//! nonzero chance, so repeated calls return varied suggestions.

use std::collections::HashSet;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::{debug, trace};

use notekey_core::Candidate;

/// Filter `candidates` against `excluded` and draw up to `output_size` of
/// the survivors, weighted by score. Output is in draw order.
///
/// Returns exactly `min(output_size, survivors)` distinct candidates. An
/// empty survivor set yields an empty result.
pub fn select<R: Rng + ?Sized>(
    candidates: Vec<Candidate>,
    excluded: &HashSet<String>,
    output_size: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    let raw_count = candidates.len();
    let pool = filter_candidates(candidates, excluded);

    debug!(
        candidate_count = raw_count,
        excluded_count = excluded.len(),
        remaining = pool.len(),
        output_size,
        "Candidates filtered"
    );

    if pool.is_empty() || output_size == 0 {
        return Vec::new();
    }
    sample_without_replacement(pool, output_size, rng)
}

/// Drop candidates that are excluded, repeated, or carry a score that cannot
/// be used as a weight. The first occurrence of a keyword wins.
pub fn filter_candidates(candidates: Vec<Candidate>, excluded: &HashSet<String>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| {
            if !c.has_positive_score() {
                trace!(keyword = %c.keyword, score = c.score, "Dropping unweighted candidate");
                return false;
            }
            !excluded.contains(&c.keyword) && seen.insert(c.keyword.clone())
        })
        .collect()
}

/// Scores as a probability distribution. Empty when no score is positive.
///
/// Scores are divided by the largest one before summing, so the total stays
/// finite for any finite input.
pub fn normalize(candidates: &[Candidate]) -> Vec<f64> {
    let max = candidates
        .iter()
        .map(|c| c.score)
        .filter(|s| s.is_finite())
        .fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }

    let scaled: Vec<f64> = candidates
        .iter()
        .map(|c| if c.has_positive_score() { c.score / max } else { 0.0 })
        .collect();
    let total: f64 = scaled.iter().sum();
    scaled.into_iter().map(|w| w / total).collect()
}

fn sample_without_replacement<R: Rng + ?Sized>(
    mut pool: Vec<Candidate>,
    output_size: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    let draws = output_size.min(pool.len());
    let mut selected = Vec::with_capacity(draws);

    while selected.len() < draws {
        let probabilities = normalize(&pool);
        let idx = match WeightedIndex::new(&probabilities) {
            Ok(dist) => dist.sample(&mut *rng),
            // Unreachable for a filtered pool; draw uniformly rather than
            // return a short result.
            Err(e) => {
                debug!(error = %e, remaining = pool.len(), "Falling back to uniform draw");
                rng.gen_range(0..pool.len())
            }
        };
        trace!(
            draw = selected.len(),
            keyword = %pool[idx].keyword,
            probability = probabilities.get(idx).copied().unwrap_or_default(),
            "Candidate drawn"
        );
        selected.push(pool.swap_remove(idx));
    }

    selected
}
