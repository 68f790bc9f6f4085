// Entry point: runs one analysis from the command line and prints the report.
use std::error::Error;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cosmic_octaves::cli::{Args, Command};
use cosmic_octaves::config::AppConfig;
use cosmic_octaves::core::delta_scan::{ScanGrid, look_elsewhere};
use cosmic_octaves::core::deviation::{deviations, strong_match_count};
use cosmic_octaves::core::force_clustering::ForceClusteringRun;
use cosmic_octaves::core::ladder::ScaleDataset;
use cosmic_octaves::core::permutation;
use cosmic_octaves::core::rg_flow;
use cosmic_octaves::data::ForceScaleTable;

const RULE: &str = "======================================================================";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut cfg = AppConfig::load_or_default(&args.config)?;
    if let Some(seed) = args.seed {
        cfg.test.seed = seed;
    }
    if let Some(n) = args.n_trials {
        cfg.test.n_trials = n;
    }
    let n_trials = cfg.test.trials(args.smoke);
    let dataset = ScaleDataset::canonical();

    match args.command {
        Command::Permutation { delta, threshold } => {
            let delta = delta.unwrap_or(cfg.test.delta);
            let threshold = threshold.unwrap_or(cfg.test.threshold);
            run_permutation(&dataset, delta, threshold, n_trials, cfg.test.seed)
        }
        Command::Scan {
            delta_min,
            delta_max,
            step,
        } => {
            let grid = ScanGrid::new(
                delta_min.unwrap_or(cfg.scan.delta_min),
                delta_max.unwrap_or(cfg.scan.delta_max),
                step.unwrap_or(cfg.scan.step),
            )?;
            run_scan(&dataset, &grid, &cfg, n_trials)
        }
        Command::Force {
            scales,
            pairing,
            append_speculative,
        } => {
            if let Some(path) = scales {
                cfg.force.scales_path = path;
            }
            if let Some(mode) = pairing {
                cfg.force.pairing = mode;
            }
            cfg.force.append_speculative |= append_speculative;
            let run = ForceClusteringRun {
                delta: cfg.test.delta,
                threshold: cfg.test.threshold,
                n_trials: cfg.test.n_trials,
                seed: cfg.test.seed,
                mode: cfg.force.pairing,
                smoke: args.smoke,
                smoke_trials: cfg.test.smoke_trials,
            };
            run_force(&dataset, &run, &cfg)
        }
        Command::RgFlow {
            t_min,
            t_max,
            n_points,
            decay,
            pert_amp,
            period,
            g0,
            window,
        } => {
            let mut params = cfg.rg_flow.params();
            params.t_min = t_min.unwrap_or(params.t_min);
            params.t_max = t_max.unwrap_or(params.t_max);
            params.n_points = n_points.unwrap_or(params.n_points);
            params.decay = decay.unwrap_or(params.decay);
            params.pert_amp = pert_amp.unwrap_or(params.pert_amp);
            params.period = period.unwrap_or(params.period);
            params.g0 = g0.unwrap_or(params.g0);
            params.window |= window;
            run_rg_flow(&params)
        }
    }
}

fn run_permutation(
    dataset: &ScaleDataset,
    delta: f64,
    threshold: f64,
    n_trials: usize,
    seed: u64,
) -> Result<(), Box<dyn Error>> {
    let devs = deviations(dataset.values(), dataset.pairs(), delta)?;
    println!("{RULE}");
    println!(
        "PERMUTATION TEST: {} structures, {} pairs, delta={delta}, threshold={threshold}",
        dataset.len(),
        dataset.pairs().len()
    );
    println!("{RULE}");
    for (pair, d) in dataset.pairs().iter().zip(&devs) {
        let mark = if *d <= threshold { "*" } else { " " };
        println!("  {mark} {:<40} deviation {d:.3}", dataset.pair_label(*pair));
    }

    info!("running {n_trials} permutation trials (seed {seed})");
    let out = permutation::run(
        dataset.values(),
        dataset.pairs(),
        delta,
        threshold,
        n_trials,
        seed,
    )?;
    let summary = out.summary();

    println!("\nObserved strong matches (<= {threshold}): {}", out.observed_count);
    println!(
        "Permutations with strong >= {}: {} out of {}",
        out.observed_count, out.exceedances, n_trials
    );
    println!("Empirical p-value:              {:.6}", out.p_empirical);
    println!("Conservative upper bound (+1):  {:.6}", out.p_conservative);
    println!("Mean random strong matches:     {:.3}", summary.mean);
    println!("Std dev random strong matches:  {:.3}", summary.std);
    println!("Observed / expected ratio:      {:.1}x", summary.observed_ratio);
    println!("\nNull distribution:");
    for (count, freq) in out.distribution().iter() {
        println!("  {count:>2}: {freq}");
    }
    Ok(())
}

fn run_scan(
    dataset: &ScaleDataset,
    grid: &ScanGrid,
    cfg: &AppConfig,
    n_trials: usize,
) -> Result<(), Box<dyn Error>> {
    let threshold = cfg.test.threshold;
    let at_delta = strong_match_count(dataset.values(), dataset.pairs(), cfg.test.delta, threshold)?;

    info!(
        "scanning delta over [{}, {}] step {} with {n_trials} trials",
        grid.delta_min, grid.delta_max, grid.step
    );
    let out = look_elsewhere(
        dataset.values(),
        dataset.pairs(),
        grid,
        threshold,
        n_trials,
        cfg.test.seed,
    )?;

    println!("{RULE}");
    println!("DELTA-SCAN / LOOK-ELSEWHERE CORRECTION");
    println!("{RULE}");
    println!("Maximum strong matches in scan: {}", out.observed.max_count);
    println!("Best delta in scan:             {:.2}", out.observed.best_delta);
    println!("Strong matches at delta={}:   {at_delta}", cfg.test.delta);
    println!(
        "\nPermutations with max strong >= {}: {} out of {n_trials}",
        out.observed.max_count, out.exceedances
    );
    println!("Empirical p-value:              {:.6}", out.p_scan);
    println!("Conservative upper bound (+1):  {:.6}", out.p_scan_upper);
    println!(
        "Scan rate of reaching {at_delta} anywhere: {:.6}",
        out.rate_reaching(at_delta)
    );
    Ok(())
}

fn run_force(
    dataset: &ScaleDataset,
    run: &ForceClusteringRun,
    cfg: &AppConfig,
) -> Result<(), Box<dyn Error>> {
    let table = ForceScaleTable::load(&cfg.force.scales_path)?;
    if !table.is_empty() {
        info!("loaded {} force scales from {}", table.len(), cfg.force.scales_path);
    }
    let out = run.execute(dataset, &table.values(), cfg.force.speculative_values())?;

    println!("{RULE}");
    println!("FORCE CLUSTERING TEST ({:?} pairing)", run.mode);
    println!(
        "n_trials={}, delta={}, threshold={}, seed={}",
        out.permutation.n_trials(),
        run.delta,
        run.threshold,
        run.seed
    );
    println!("{RULE}");
    println!(
        "Total scales: {} (base {}, added {})",
        out.n_base + out.n_added,
        out.n_base,
        out.n_added
    );
    println!("Pairs scored: {}", out.pairs_tested);
    println!(
        "Approximate expected strong matches under uniform random: ~{:.1}",
        out.expected_rough
    );
    let p = &out.permutation;
    println!("\nObserved strong matches (<= {}): {}", run.threshold, p.observed_count);
    println!(
        "Permutations with strong >= {}: {} out of {}",
        p.observed_count,
        p.exceedances,
        p.n_trials()
    );
    println!("Empirical p-value:              {:.6}", p.p_empirical);
    println!("Conservative upper bound (+1):  {:.6}", p.p_conservative);
    Ok(())
}

fn run_rg_flow(params: &rg_flow::RgFlowParams) -> Result<(), Box<dyn Error>> {
    let out = rg_flow::analyze(params)?;
    println!(
        "Grid: {} points, dt={:.4}, range={:.1} to {:.1}",
        out.trajectory.len(),
        out.dt,
        params.t_min,
        params.t_max
    );
    println!("Integrator: RK4 (fixed step)");
    println!(
        "Dominant frequency: {:.6} cycles/log10 unit",
        out.dominant.frequency
    );
    println!("Dominant period:    {:.3} log10 units", out.dominant_period());
    if !out.peaks.is_empty() {
        println!("Top peak frequencies / periods:");
        for pk in &out.peaks {
            println!("  freq={:.6}, period={:.3}", pk.frequency, pk.period);
        }
    }
    Ok(())
}
