use clap::{Parser, Subcommand};

use crate::core::force_clustering::PairingMode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, global = true, default_value = "octaves.toml")]
    pub config: String,

    /// RNG seed for permutation runs (overrides config)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Number of permutation trials (overrides config)
    #[arg(long, global = true)]
    pub n_trials: Option<usize>,

    /// Quick run capped at the configured smoke trial count
    #[arg(long, global = true, default_value_t = false)]
    pub smoke: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Permutation test at a single target separation
    Permutation {
        /// Target log10 separation (overrides config)
        #[arg(long)]
        delta: Option<f64>,
        /// Strong-match threshold (overrides config)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Delta scan with look-elsewhere permutation correction
    Scan {
        #[arg(long)]
        delta_min: Option<f64>,
        #[arg(long)]
        delta_max: Option<f64>,
        #[arg(long)]
        step: Option<f64>,
    },
    /// Permutation test over the ladder enlarged by force scales
    Force {
        /// Force-scale table (overrides config)
        #[arg(long)]
        scales: Option<String>,
        /// Which pairs are scored
        #[arg(long, value_enum)]
        pairing: Option<PairingMode>,
        /// Append speculative dark-matter / dark-energy scales
        #[arg(long, default_value_t = false)]
        append_speculative: bool,
    },
    /// Toy RG flow integration and spectral period
    RgFlow {
        #[arg(long, allow_hyphen_values = true)]
        t_min: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        t_max: Option<f64>,
        #[arg(long)]
        n_points: Option<usize>,
        #[arg(long, allow_hyphen_values = true)]
        decay: Option<f64>,
        #[arg(long)]
        pert_amp: Option<f64>,
        #[arg(long)]
        period: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        g0: Option<f64>,
        /// Apply a Hann window before the transform
        #[arg(long, default_value_t = false)]
        window: bool,
    },
}
