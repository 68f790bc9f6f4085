//! core/force_clustering.rs — Permutation test over the ladder enlarged by force scales.
//!
//! The base ladder is concatenated with auxiliary force-scale values (and,
//! when enabled, speculative dark-matter/dark-energy scales). The whole pool
//! is permuted; which pairs are scored depends on [`PairingMode`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::Result;
use crate::core::ladder::{PairSpec, ScaleDataset, validate_pairs};
use crate::core::permutation::{self, PermutationOutcome, require_trials};

/// DM halo (~10^21 m) and DE horizon (~10^26.5 m) placeholders.
pub const DEFAULT_SPECULATIVE: [f64; 2] = [21.0, 26.5];
pub const DEFAULT_SMOKE_TRIALS: usize = 2_000;
/// Orders of magnitude spanned by the ladder, for the uniform baseline.
pub const DEFAULT_SPAN_DECADES: f64 = 42.0;

/// Which index pairs of the enlarged pool are scored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PairingMode {
    /// Only the canonical ladder rungs; added values just enlarge the pool.
    #[default]
    Canonical,
    /// Every (base, added) pair.
    CrossDomain,
    /// Every pair in the pool.
    AllPairs,
}

/// `base ++ extra (++ speculative)`.
pub fn concat_pool(base: &[f64], extra: &[f64], speculative: Option<&[f64]>) -> Vec<f64> {
    let spec = speculative.unwrap_or(&[]);
    let mut pool = Vec::with_capacity(base.len() + extra.len() + spec.len());
    pool.extend_from_slice(base);
    pool.extend_from_slice(extra);
    pool.extend_from_slice(spec);
    pool
}

/// Pairs scored under `mode` for a pool whose first `n_base` entries are the ladder.
pub fn pairs_for_mode(
    mode: PairingMode,
    canonical: &[PairSpec],
    n_base: usize,
    n_total: usize,
) -> Vec<PairSpec> {
    match mode {
        PairingMode::Canonical => canonical.to_vec(),
        PairingMode::CrossDomain => (0..n_base)
            .flat_map(|i| (n_base..n_total).map(move |j| PairSpec::new(i, j)))
            .collect(),
        PairingMode::AllPairs => (0..n_total)
            .flat_map(|i| ((i + 1)..n_total).map(move |j| PairSpec::new(i, j)))
            .collect(),
    }
}

/// Expected strong matches if every value were uniform over `span` decades.
pub fn rough_expected_matches(n_pairs: usize, threshold: f64, span: f64) -> f64 {
    n_pairs as f64 * 2.0 * threshold / span
}

/// Permutation test over the concatenated pool with canonical pairs only.
///
/// `pairs` must index the base ladder; the added values change the null
/// distribution but never the observed count.
#[allow(clippy::too_many_arguments)]
pub fn extended_scores(
    base: &[f64],
    extra: &[f64],
    speculative: Option<&[f64]>,
    pairs: &[PairSpec],
    delta: f64,
    threshold: f64,
    n_trials: usize,
    seed: u64,
) -> Result<PermutationOutcome> {
    require_trials(n_trials)?;
    validate_pairs(base.len(), pairs)?;
    let pool = concat_pool(base, extra, speculative);
    permutation::run(&pool, pairs, delta, threshold, n_trials, seed)
}

/// Parameters of one force-clustering run.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceClusteringRun {
    pub delta: f64,
    pub threshold: f64,
    pub n_trials: usize,
    pub seed: u64,
    pub mode: PairingMode,
    /// Cap trials at `smoke_trials` for a quick validation pass.
    pub smoke: bool,
    pub smoke_trials: usize,
}

impl Default for ForceClusteringRun {
    fn default() -> Self {
        Self {
            delta: crate::core::deviation::DEFAULT_DELTA,
            threshold: crate::core::deviation::DEFAULT_THRESHOLD,
            n_trials: permutation::DEFAULT_TRIALS,
            seed: permutation::DEFAULT_SEED,
            mode: PairingMode::Canonical,
            smoke: false,
            smoke_trials: DEFAULT_SMOKE_TRIALS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForceClusteringOutcome {
    pub n_base: usize,
    pub n_added: usize,
    pub pairs_tested: usize,
    pub expected_rough: f64,
    pub permutation: PermutationOutcome,
}

impl ForceClusteringRun {
    pub fn effective_trials(&self) -> usize {
        if self.smoke {
            self.n_trials.min(self.smoke_trials)
        } else {
            self.n_trials
        }
    }

    pub fn execute(
        &self,
        base: &ScaleDataset,
        extra: &[f64],
        speculative: Option<&[f64]>,
    ) -> Result<ForceClusteringOutcome> {
        let n_trials = self.effective_trials();
        require_trials(n_trials)?;

        let n_base = base.len();
        let pool = concat_pool(base.values(), extra, speculative);
        let n_added = pool.len() - n_base;
        let pairs = pairs_for_mode(self.mode, base.pairs(), n_base, pool.len());

        info!(
            "force clustering: {} scales (base {n_base}, added {n_added}), mode {:?}, {} pairs, {n_trials} trials",
            pool.len(),
            self.mode,
            pairs.len()
        );
        if n_added == 0 {
            debug!("no auxiliary scales; null distribution equals the base ladder's");
        }

        let permutation =
            permutation::run(&pool, &pairs, self.delta, self.threshold, n_trials, self.seed)?;
        Ok(ForceClusteringOutcome {
            n_base,
            n_added,
            pairs_tested: pairs.len(),
            expected_rough: rough_expected_matches(pairs.len(), self.threshold, DEFAULT_SPAN_DECADES),
            permutation,
        })
    }
}
