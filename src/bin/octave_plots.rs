use std::error::Error;
use std::fs::create_dir_all;
use std::path::Path;

use plotters::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cosmic_octaves::config::AppConfig;
use cosmic_octaves::core::delta_scan::{look_elsewhere, scan_profile};
use cosmic_octaves::core::force_clustering::ForceClusteringRun;
use cosmic_octaves::core::ladder::{CANONICAL_LOGS, ScaleDataset};
use cosmic_octaves::core::permutation::{self, EmpiricalDistribution};
use cosmic_octaves::core::rg_flow::{self, RgFlowAnalysis};
use cosmic_octaves::data::ForceScaleTable;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let out_dir = Path::new("target/plots/octaves");
    create_dir_all(out_dir)?;

    let cfg = AppConfig::load_or_default("octaves.toml")?;
    let dataset = ScaleDataset::canonical();

    plot_permutation(out_dir, &cfg, &dataset)?;
    plot_delta_scan(out_dir, &cfg, &dataset)?;
    plot_force_clustering(out_dir, &cfg, &dataset)?;
    plot_rg_flow(out_dir, &cfg)?;

    println!("Saved octave plots to {}", out_dir.display());
    Ok(())
}

fn plot_permutation(
    out_dir: &Path,
    cfg: &AppConfig,
    dataset: &ScaleDataset,
) -> Result<(), Box<dyn Error>> {
    let t = &cfg.test;
    info!("permutation histogram: {} trials", t.n_trials);
    let out = permutation::run(
        dataset.values(),
        dataset.pairs(),
        t.delta,
        t.threshold,
        t.n_trials,
        t.seed,
    )?;
    render_count_histogram(
        &out_dir.join("permutation_test_histogram.png"),
        "Permutation Test: Cosmic Octave Pattern",
        &format!("strong matches (deviation <= {})", t.threshold),
        &out.distribution(),
        out.observed_count,
        &BLUE,
    )
}

fn plot_delta_scan(
    out_dir: &Path,
    cfg: &AppConfig,
    dataset: &ScaleDataset,
) -> Result<(), Box<dyn Error>> {
    let grid = cfg.scan.grid();
    let t = &cfg.test;
    let profile = scan_profile(dataset.values(), dataset.pairs(), &grid, t.threshold)?;
    render_scan_profile(&out_dir.join("delta_scan_profile.png"), &profile)?;

    info!("look-elsewhere histogram: {} trials", t.n_trials);
    let out = look_elsewhere(
        dataset.values(),
        dataset.pairs(),
        &grid,
        t.threshold,
        t.n_trials,
        t.seed,
    )?;
    render_count_histogram(
        &out_dir.join("delta_scan_histogram.png"),
        &format!(
            "Look-Elsewhere: max strong matches for delta in [{}, {}]",
            grid.delta_min, grid.delta_max
        ),
        "maximum strong matches over scan",
        &EmpiricalDistribution::from_counts(&out.null_maxima),
        out.observed.max_count,
        &RED,
    )
}

fn plot_force_clustering(
    out_dir: &Path,
    cfg: &AppConfig,
    dataset: &ScaleDataset,
) -> Result<(), Box<dyn Error>> {
    let table = ForceScaleTable::load(&cfg.force.scales_path)?;
    let run = ForceClusteringRun {
        delta: cfg.test.delta,
        threshold: cfg.test.threshold,
        n_trials: cfg.test.n_trials,
        seed: cfg.test.seed,
        mode: cfg.force.pairing,
        smoke: false,
        smoke_trials: cfg.test.smoke_trials,
    };
    let out = run.execute(dataset, &table.values(), cfg.force.speculative_values())?;
    render_count_histogram(
        &out_dir.join("force_clustering_hist.png"),
        &format!("Force Clustering ({:?} pairing)", run.mode),
        "strong matches",
        &out.permutation.distribution(),
        out.permutation.observed_count,
        &MAGENTA,
    )
}

fn plot_rg_flow(out_dir: &Path, cfg: &AppConfig) -> Result<(), Box<dyn Error>> {
    let analysis = rg_flow::analyze(&cfg.rg_flow.params())?;
    render_trajectory(&out_dir.join("rg_flow_g_t.png"), &analysis)?;
    render_spectrum(&out_dir.join("rg_flow_fft.png"), &analysis)
}

fn render_count_histogram(
    out_path: &Path,
    caption: &str,
    x_desc: &str,
    dist: &EmpiricalDistribution,
    observed: usize,
    color: &RGBColor,
) -> Result<(), Box<dyn Error>> {
    let x_max = (dist.frequencies.len().max(observed + 1) + 1) as f64;
    let y_max = dist
        .frequencies
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let root = BitMapBackend::new(out_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0f64..x_max, 0.0f64..(y_max * 1.1))?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(format!("frequency (of {} trials)", dist.n_trials))
        .draw()?;

    for (count, freq) in dist.iter() {
        let x0 = count as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, 0.0), (x0 + 0.9, freq as f64)],
            color.mix(0.7).filled(),
        )))?;
    }

    let x_obs = observed as f64 + 0.45;
    chart
        .draw_series(LineSeries::new(
            vec![(x_obs, 0.0), (x_obs, y_max * 1.1)],
            RED.stroke_width(2),
        ))?
        .label(format!("observed: {observed}"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn render_scan_profile(out_path: &Path, profile: &[(f64, usize)]) -> Result<(), Box<dyn Error>> {
    let (Some(first), Some(last)) = (profile.first(), profile.last()) else {
        return Ok(());
    };
    let y_max = profile.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1) as f64;

    let root = BitMapBackend::new(out_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Strong Matches vs Target Separation", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first.0..last.0.max(first.0 + 1e-9), 0.0f64..(y_max + 1.0))?;

    chart
        .configure_mesh()
        .x_desc("delta (log10 units)")
        .y_desc("strong matches")
        .draw()?;

    chart.draw_series(LineSeries::new(
        profile.iter().map(|&(d, c)| (d, c as f64)),
        &BLUE,
    ))?;
    root.present()?;
    Ok(())
}

fn render_trajectory(out_path: &Path, analysis: &RgFlowAnalysis) -> Result<(), Box<dyn Error>> {
    let traj = &analysis.trajectory;
    let (Some(&t0), Some(&t1)) = (traj.t.first(), traj.t.last()) else {
        return Ok(());
    };
    let g_min = traj.g.iter().copied().fold(f64::INFINITY, f64::min);
    let g_max = traj.g.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let pad = ((g_max - g_min) * 0.05).max(1e-6);

    let root = BitMapBackend::new(out_path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Toy RG Flow Integration (period={:.2})", analysis.dominant_period()),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(t0..t1, (g_min - pad)..(g_max + pad))?;

    chart
        .configure_mesh()
        .x_desc("log10(length)")
        .y_desc("toy coupling g(t)")
        .draw()?;

    for &l in CANONICAL_LOGS.iter().filter(|&&l| l >= t0 && l <= t1) {
        chart.draw_series(LineSeries::new(
            vec![(l, g_min - pad), (l, g_max + pad)],
            BLACK.mix(0.3),
        ))?;
    }
    chart.draw_series(LineSeries::new(traj.points(), &BLUE))?;
    root.present()?;
    Ok(())
}

fn render_spectrum(out_path: &Path, analysis: &RgFlowAnalysis) -> Result<(), Box<dyn Error>> {
    let f_max = analysis.frequencies.last().copied().unwrap_or(1.0).max(1e-9);
    let m_max = analysis
        .magnitudes
        .iter()
        .copied()
        .fold(0.0f64, f64::max)
        .max(1e-12);

    let root = BitMapBackend::new(out_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("FFT of g(t)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..f_max, 0.0f64..(m_max * 1.05))?;

    chart
        .configure_mesh()
        .x_desc("frequency (cycles per log10 unit)")
        .y_desc("magnitude")
        .draw()?;

    chart.draw_series(LineSeries::new(
        analysis
            .frequencies
            .iter()
            .copied()
            .zip(analysis.magnitudes.iter().copied()),
        &BLUE,
    ))?;

    let dom = analysis.dominant;
    chart
        .draw_series(LineSeries::new(
            vec![(dom.frequency, 0.0), (dom.frequency, m_max * 1.05)],
            RED.mix(0.6),
        ))?
        .label(format!(
            "peak freq={:.4} (period={:.2})",
            dom.frequency, dom.period
        ))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
