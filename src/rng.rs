//! RNG helpers shared by the simulators: biased coin flips and sparse
//! hit-index sampling for noise channels (`DEPOLARIZE1`-style error
//! injection is cheap to simulate by sampling which *positions* flip rather
//! than flipping a coin per position).

use rand::RngCore;

use crate::error::{CoreError, CoreResult};

/// Rejects a probability argument outside `[0, 1]`.
pub fn check_probability(probability: f64) -> CoreResult<()> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(CoreError::NumericRange(format!("probability {probability} is outside [0, 1]")));
    }
    Ok(())
}

/// Rejects a set of channel weights that individually fall outside `[0, 1]`
/// or that sum to more than `1.0` (leaving no room for the "no error"
/// outcome).
pub fn check_channel_weights(weights: &[f64]) -> CoreResult<()> {
    let mut total = 0.0;
    for &w in weights {
        check_probability(w)?;
        total += w;
    }
    if total > 1.0 {
        return Err(CoreError::NumericRange(format!("channel probabilities sum to {total}, which exceeds 1")));
    }
    Ok(())
}

/// A single coin flip with `P(true) = probability`.
pub fn biased_bit<R: RngCore>(rng: &mut R, probability: f64) -> bool {
    debug_assert!((0.0..=1.0).contains(&probability));
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    let u = (rng.next_u32() as f64) / (u32::MAX as f64 + 1.0);
    u < probability
}

/// Samples the (sorted, deduplicated) set of indices in `0..len` that "hit",
/// i.e. independently flip a `probability`-biased coin, without visiting
/// every index when `probability` is small: draws a geometric gap to the
/// next hit instead of `len` individual coin flips.
pub fn sparse_hits<R: RngCore>(rng: &mut R, len: usize, probability: f64) -> Vec<usize> {
    let mut hits = Vec::new();
    if probability <= 0.0 || len == 0 {
        return hits;
    }
    if probability >= 1.0 {
        return (0..len).collect();
    }
    let mut pos = 0usize;
    let ln_complement = (1.0 - probability).ln();
    loop {
        let u = (rng.next_u32() as f64 + 1.0) / (u32::MAX as f64 + 2.0);
        let gap = (u.ln() / ln_complement).floor() as i64;
        if gap < 0 {
            pos += 1;
        } else {
            pos += gap as usize + 1;
        }
        if pos > len {
            break;
        }
        hits.push(pos - 1);
    }
    hits
}

/// Chooses one of `weights.len()` outcomes, with `P(i) = weights[i]`.
/// `weights` need not sum to exactly `1.0`; the last outcome absorbs the
/// remainder. Used for `PAULI_CHANNEL_1`/`PAULI_CHANNEL_2`-style multi-way
/// noise and for `CORRELATED_ERROR`/`ELSE_CORRELATED_ERROR` chains.
pub fn weighted_choice<R: RngCore>(rng: &mut R, weights: &[f64]) -> usize {
    assert!(!weights.is_empty());
    let u = (rng.next_u32() as f64) / (u32::MAX as f64 + 1.0);
    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        acc += w;
        if u < acc {
            return i;
        }
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn biased_bit_respects_the_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(!biased_bit(&mut rng, 0.0));
        assert!(biased_bit(&mut rng, 1.0));
    }

    #[test]
    fn sparse_hits_all_within_range_and_sorted() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let hits = sparse_hits(&mut rng, 1000, 0.01);
        for w in hits.windows(2) {
            assert!(w[0] < w[1]);
        }
        for &h in &hits {
            assert!(h < 1000);
        }
    }

    #[test]
    fn sparse_hits_probability_one_hits_everything() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let hits = sparse_hits(&mut rng, 5, 1.0);
        assert_eq!(hits, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn weighted_choice_picks_the_only_option() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(weighted_choice(&mut rng, &[1.0]), 0);
    }
}
