use approx::assert_abs_diff_eq;
use cosmic_octaves::core::delta_scan::{ScanGrid, max_strong_matches_in_scan};
use cosmic_octaves::core::deviation::{deviations, strong_match_count, strong_matches};
use cosmic_octaves::core::ladder::{PairSpec, ScaleDataset};
use cosmic_octaves::core::permutation;

#[test]
fn two_value_ladder_scores_one_match() {
    let values = [-15.08, 8.84];
    let pairs = [PairSpec::new(0, 1)];
    let devs = deviations(&values, &pairs, 24.0).unwrap();
    assert_abs_diff_eq!(devs[0], 0.08, epsilon = 1e-9);
    assert_eq!(strong_match_count(&values, &pairs, 24.0, 0.2).unwrap(), 1);
}

#[test]
fn seven_pair_deviation_profile() {
    // pair k compares (2k, 2k+1) at a separation of 24 + dev_k
    let devs = [0.08, 1.07, 0.63, 0.665, 0.0, 0.114, 0.36];
    let mut values = Vec::new();
    let mut pairs = Vec::new();
    for (k, d) in devs.iter().enumerate() {
        values.push(0.0);
        values.push(24.0 + d);
        pairs.push(PairSpec::new(2 * k, 2 * k + 1));
    }
    let got = deviations(&values, &pairs, 24.0).unwrap();
    for (g, d) in got.iter().zip(devs) {
        assert_abs_diff_eq!(*g, d, epsilon = 1e-9);
    }
    assert_eq!(strong_match_count(&values, &pairs, 24.0, 0.2).unwrap(), 3);
    assert_eq!(strong_matches(&values, &pairs, 24.0, 0.2).unwrap(), vec![0, 4, 5]);
}

#[test]
fn full_run_is_rare_and_reproducible() {
    let ds = ScaleDataset::canonical();
    let a = permutation::run(ds.values(), ds.pairs(), 24.0, 0.2, 200_000, 42).unwrap();
    let b = permutation::run(ds.values(), ds.pairs(), 24.0, 0.2, 200_000, 42).unwrap();

    assert_eq!(a.observed_count, 3);
    assert_eq!(a.exceedances, b.exceedances);
    assert_eq!(a.null_counts, b.null_counts);
    assert_eq!(a.p_empirical, b.p_empirical);
    assert_eq!(a.p_conservative, b.p_conservative);

    // 11 of 200k seeded relabelings reach three strong matches
    assert_eq!(a.exceedances, 11);
    assert_abs_diff_eq!(a.p_empirical, 11.0 / 200_000.0, epsilon = 1e-15);
    assert_abs_diff_eq!(a.p_conservative, 12.0 / 200_001.0, epsilon = 1e-15);
    assert!(a.p_conservative >= a.p_empirical);
    assert_eq!(a.distribution().tail_at_least(3), a.exceedances);
}

#[test]
fn one_trial_gives_binary_p_values() {
    let ds = ScaleDataset::canonical();
    for seed in [0, 1, 42, 1234] {
        let out = permutation::run(ds.values(), ds.pairs(), 24.0, 0.2, 1, seed).unwrap();
        if out.exceedances == 1 {
            assert_eq!((out.p_empirical, out.p_conservative), (1.0, 1.0));
        } else {
            assert_eq!((out.p_empirical, out.p_conservative), (0.0, 0.5));
        }
    }
}

#[test]
fn scan_covers_every_grid_point() {
    let ds = ScaleDataset::canonical();
    let grid = ScanGrid::new(22.0, 26.0, 0.05).unwrap();
    let best = max_strong_matches_in_scan(ds.values(), ds.pairs(), &grid, 0.2).unwrap();
    let pointwise_max = grid
        .deltas()
        .map(|d| strong_match_count(ds.values(), ds.pairs(), d, 0.2).unwrap())
        .max()
        .unwrap();
    assert_eq!(best.max_count, pointwise_max);
    assert_eq!(
        strong_match_count(ds.values(), ds.pairs(), best.best_delta, 0.2).unwrap(),
        best.max_count
    );
}
