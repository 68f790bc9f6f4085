//! core/permutation.rs — Label-permutation null test for the strong-match count.
//!
//! Each trial relabels the scale values by a uniformly random permutation
//! while the pair indices stay fixed, then recomputes the statistic. One
//! `StdRng` is built from the caller's seed per run and drives every trial in
//! order, so identical inputs give bit-identical null counts.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::core::deviation::count_within;
use crate::core::error::{OctaveError, Result, require_finite};
use crate::core::ladder::{PairSpec, validate_pairs};

pub const DEFAULT_TRIALS: usize = 200_000;
pub const DEFAULT_SEED: u64 = 42;

/// Result of one permutation run.
#[derive(Clone, Debug, PartialEq)]
pub struct PermutationOutcome {
    pub observed_count: usize,
    /// Trials whose count reached `observed_count`.
    pub exceedances: usize,
    pub p_empirical: f64,
    /// Add-one estimate, never zero and never below `p_empirical`.
    pub p_conservative: f64,
    pub null_counts: Vec<usize>,
}

impl PermutationOutcome {
    pub fn n_trials(&self) -> usize {
        self.null_counts.len()
    }

    pub fn distribution(&self) -> EmpiricalDistribution {
        EmpiricalDistribution::from_counts(&self.null_counts)
    }

    pub fn summary(&self) -> NullSummary {
        NullSummary::new(&self.null_counts, self.observed_count)
    }
}

/// Frequency of each count over all trials of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmpiricalDistribution {
    /// `frequencies[k]` = number of trials that produced count k.
    pub frequencies: Vec<usize>,
    pub n_trials: usize,
}

impl EmpiricalDistribution {
    pub fn from_counts(counts: &[usize]) -> Self {
        let len = counts.iter().copied().max().map_or(0, |m| m + 1);
        let mut frequencies = vec![0usize; len];
        for &c in counts {
            frequencies[c] += 1;
        }
        Self {
            frequencies,
            n_trials: counts.len(),
        }
    }

    pub fn frequency(&self, count: usize) -> usize {
        self.frequencies.get(count).copied().unwrap_or(0)
    }

    /// Trials with count ≥ `count`.
    pub fn tail_at_least(&self, count: usize) -> usize {
        self.frequencies.iter().skip(count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.frequencies.iter().copied().enumerate()
    }
}

/// Moments of a null distribution, for reporting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NullSummary {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub max: usize,
    /// observed / mean; infinite when the null mean is zero.
    pub observed_ratio: f64,
}

impl NullSummary {
    pub fn new(counts: &[usize], observed: usize) -> Self {
        if counts.is_empty() {
            return Self {
                mean: 0.0,
                std: 0.0,
                max: 0,
                observed_ratio: f64::INFINITY,
            };
        }
        let n = counts.len() as f64;
        let mean = counts.iter().map(|&c| c as f64).sum::<f64>() / n;
        let var = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let observed_ratio = if mean > 0.0 {
            observed as f64 / mean
        } else {
            f64::INFINITY
        };
        Self {
            mean,
            std: var.sqrt(),
            max: counts.iter().copied().max().unwrap_or(0),
            observed_ratio,
        }
    }
}

pub(crate) fn require_trials(n_trials: usize) -> Result<()> {
    if n_trials == 0 {
        return Err(OctaveError::invalid("n_trials", "must be at least 1"));
    }
    Ok(())
}

/// Evaluate `statistic` on `n_trials` seeded random permutations of `values`.
///
/// Every trial permutes a fresh copy of the original order.
pub fn permutation_null<F>(values: &[f64], n_trials: usize, seed: u64, mut statistic: F) -> Result<Vec<usize>>
where
    F: FnMut(&[f64]) -> usize,
{
    require_trials(n_trials)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut permuted = values.to_vec();
    let mut out = Vec::with_capacity(n_trials);
    let report_every = (n_trials / 10).max(1);

    for trial in 0..n_trials {
        permuted.copy_from_slice(values);
        permuted.shuffle(&mut rng);
        out.push(statistic(&permuted));

        if (trial + 1) % report_every == 0 {
            debug!(
                target: "permutation",
                "progress: {} / {} trials ({:.0}%)",
                trial + 1,
                n_trials,
                (trial + 1) as f64 / n_trials as f64 * 100.0
            );
        }
    }
    Ok(out)
}

/// (exceedances, p_empirical, p_conservative) of `observed` against `null`.
pub fn exceedance_pvalues(observed: usize, null: &[usize]) -> (usize, f64, f64) {
    let n = null.len();
    let exceed = null.iter().filter(|&&c| c >= observed).count();
    if n == 0 {
        return (0, 1.0, 1.0);
    }
    let p_empirical = exceed as f64 / n as f64;
    let p_conservative = (exceed + 1) as f64 / (n + 1) as f64;
    (exceed, p_empirical, p_conservative)
}

/// Permutation test of the strong-match count at a single target separation.
pub fn run(
    values: &[f64],
    pairs: &[PairSpec],
    delta: f64,
    threshold: f64,
    n_trials: usize,
    seed: u64,
) -> Result<PermutationOutcome> {
    require_trials(n_trials)?;
    validate_pairs(values.len(), pairs)?;
    require_finite("delta", delta)?;
    require_finite("threshold", threshold)?;

    let observed_count = count_within(values, pairs, delta, threshold);
    let null_counts = permutation_null(values, n_trials, seed, |perm| {
        count_within(perm, pairs, delta, threshold)
    })?;
    let (exceedances, p_empirical, p_conservative) =
        exceedance_pvalues(observed_count, &null_counts);

    debug!(
        target: "permutation",
        "observed={observed_count} exceed={exceedances}/{n_trials} p={p_empirical:.6} p_upper={p_conservative:.6}"
    );

    Ok(PermutationOutcome {
        observed_count,
        exceedances,
        p_empirical,
        p_conservative,
        null_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::ladder::{CANONICAL_LOGS, CANONICAL_PAIRS};

    #[test]
    fn same_seed_reproduces_null_counts() {
        let a = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.2, 2_000, 42).unwrap();
        let b = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.2, 2_000, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.observed_count, 3);
        assert_eq!(a.n_trials(), 2_000);
    }

    #[test]
    fn different_seeds_differ() {
        let a = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.7, 500, 1).unwrap();
        let b = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.7, 500, 2).unwrap();
        assert_ne!(a.null_counts, b.null_counts);
    }

    #[test]
    fn conservative_never_below_empirical() {
        for seed in 0..20 {
            for tau in [0.05, 0.2, 0.7, 2.0] {
                let out = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, tau, 50, seed).unwrap();
                assert!(out.p_conservative >= out.p_empirical);
                assert!(out.p_conservative > 0.0);
            }
        }
    }

    #[test]
    fn single_trial_p_values_are_binary() {
        for seed in 0..32 {
            let out = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.2, 1, seed).unwrap();
            assert!(out.p_empirical == 0.0 || out.p_empirical == 1.0);
            assert!(out.p_conservative == 0.5 || out.p_conservative == 1.0);
        }
    }

    #[test]
    fn zero_trials_is_rejected() {
        let err = run(&CANONICAL_LOGS, &CANONICAL_PAIRS, 24.0, 0.2, 0, 42).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn permutations_preserve_the_multiset() {
        let mut seen = Vec::new();
        permutation_null(&CANONICAL_LOGS, 5, 9, |perm| {
            let mut sorted = perm.to_vec();
            sorted.sort_by(f64::total_cmp);
            seen.push(sorted);
            0
        })
        .unwrap();
        for s in seen {
            assert_eq!(s, CANONICAL_LOGS.to_vec());
        }
    }

    #[test]
    fn distribution_and_summary_agree_with_counts() {
        let counts = [0, 1, 1, 3, 0, 1];
        let dist = EmpiricalDistribution::from_counts(&counts);
        assert_eq!(dist.frequencies, vec![2, 3, 0, 1]);
        assert_eq!(dist.tail_at_least(1), 4);
        assert_eq!(dist.frequency(7), 0);

        let s = NullSummary::new(&counts, 3);
        assert!((s.mean - 1.0).abs() < 1e-12);
        assert!((s.std - 1.0).abs() < 1e-12);
        assert_eq!(s.max, 3);
        assert!((s.observed_ratio - 3.0).abs() < 1e-12);
    }

    #[test]
    fn exceedances_use_add_one_estimator() {
        let (k, p, p_up) = exceedance_pvalues(2, &[0, 2, 3, 1]);
        assert_eq!(k, 2);
        assert!((p - 0.5).abs() < 1e-12);
        assert!((p_up - 0.6).abs() < 1e-12);
    }
}
