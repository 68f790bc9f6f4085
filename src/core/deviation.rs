//! core/deviation.rs — Per-pair deviation from a target log separation.
//!
//! d = |(L_j - L_i) - Δ|, recomputed from the current values on every call.
//! A pair is a strong match when d ≤ τ.

use crate::core::error::{Result, require_finite};
use crate::core::ladder::{PairSpec, validate_pairs};

pub const DEFAULT_DELTA: f64 = 24.0;
pub const DEFAULT_THRESHOLD: f64 = 0.2;

#[inline]
fn deviation_of(values: &[f64], pair: PairSpec, delta: f64) -> f64 {
    ((values[pair.large] - values[pair.small]) - delta).abs()
}

/// One deviation per pair, in pair order.
pub fn deviations(values: &[f64], pairs: &[PairSpec], delta: f64) -> Result<Vec<f64>> {
    validate_pairs(values.len(), pairs)?;
    require_finite("delta", delta)?;
    Ok(pairs.iter().map(|&p| deviation_of(values, p, delta)).collect())
}

/// Number of pairs whose deviation is within `threshold`.
pub fn strong_match_count(
    values: &[f64],
    pairs: &[PairSpec],
    delta: f64,
    threshold: f64,
) -> Result<usize> {
    validate_pairs(values.len(), pairs)?;
    require_finite("delta", delta)?;
    require_finite("threshold", threshold)?;
    Ok(count_within(values, pairs, delta, threshold))
}

/// Indices (into `pairs`) of the strong matches.
pub fn strong_matches(
    values: &[f64],
    pairs: &[PairSpec],
    delta: f64,
    threshold: f64,
) -> Result<Vec<usize>> {
    let devs = deviations(values, pairs, delta)?;
    require_finite("threshold", threshold)?;
    Ok(devs
        .iter()
        .enumerate()
        .filter(|(_, d)| **d <= threshold)
        .map(|(k, _)| k)
        .collect())
}

/// Inner-loop count. Callers must have run `validate_pairs` for this length.
#[inline]
pub(crate) fn count_within(values: &[f64], pairs: &[PairSpec], delta: f64, threshold: f64) -> usize {
    debug_assert!(pairs.iter().all(|p| p.max_index() < values.len()));
    pairs
        .iter()
        .filter(|&&p| deviation_of(values, p, delta) <= threshold)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::ladder::{CANONICAL_LOGS, CANONICAL_PAIRS};
    use approx::assert_abs_diff_eq;

    #[test]
    fn proton_to_sun_is_a_strong_match() {
        let values = [-15.08, 8.84];
        let pairs = [PairSpec::new(0, 1)];
        let devs = deviations(&values, &pairs, 24.0).unwrap();
        assert_eq!(devs.len(), 1);
        assert_abs_diff_eq!(devs[0], 0.08, epsilon = 1e-9);
        assert_eq!(strong_match_count(&values, &pairs, 24.0, 0.2).unwrap(), 1);
    }

    #[test]
    fn canonical_ladder_has_three_strong_matches() {
        let devs = deviations(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0).unwrap();
        let expected = [0.08, 1.07, 0.63, 0.665, 0.0, 0.114, 0.36];
        for (d, e) in devs.iter().zip(expected) {
            assert_abs_diff_eq!(*d, e, epsilon = 1e-9);
        }
        assert_eq!(
            strong_match_count(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.2).unwrap(),
            3
        );
        assert_eq!(
            strong_matches(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.2).unwrap(),
            vec![0, 4, 5]
        );
    }

    #[test]
    fn empty_pairs_score_nothing() {
        assert!(deviations(&[1.0], &[], 24.0).unwrap().is_empty());
        assert_eq!(strong_match_count(&[], &[], 24.0, 0.2).unwrap(), 0);
    }

    #[test]
    fn short_sequence_is_an_index_error() {
        let err = deviations(&[1.0, 2.0], &[PairSpec::new(0, 5)], 24.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn count_is_monotone_in_threshold() {
        for delta in [22.0, 23.5, 24.0, 24.7, 26.0] {
            let mut prev = 0;
            for step in 0..=40 {
                let tau = step as f64 * 0.05;
                let c = strong_match_count(&CANONICAL_LOGS, &CANONICAL_PAIRS, delta, tau).unwrap();
                assert!(c >= prev, "delta={delta} tau={tau}: {c} < {prev}");
                prev = c;
            }
        }
    }

    #[test]
    fn inputs_are_left_untouched() {
        let values = CANONICAL_LOGS.to_vec();
        let _ = deviations(&values, &CANONICAL_PAIRS, 24.0).unwrap();
        assert_eq!(values, CANONICAL_LOGS.to_vec());
    }
}
