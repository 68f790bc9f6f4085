//! core/rg_flow.rs — Toy coupling flow over log10(length) and its dominant period.
//!
//! dg/dt = -decay·g + pert_amp·sin(2πt/period), g(t_min) = g0.
//!
//! Integration is classical fixed-step RK4 with dt = (t_max - t_min)/(n_points - 1).
//! The trajectory is mean-removed, optionally Hann-windowed, and transformed;
//! the dominant period is 1/f of the largest non-DC bin. Equal maxima resolve
//! to the lowest frequency.

use std::f64::consts::PI;

use tracing::debug;

use crate::core::error::{OctaveError, Result, require_finite};
use crate::core::fft::{apply_hann_window, magnitude_spectrum, remove_mean, rfft_freqs};

/// Local peaks below this fraction of the dominant magnitude are not reported.
const PEAK_REL_HEIGHT: f64 = 0.1;
const MAX_REPORTED_PEAKS: usize = 3;
/// A dominant magnitude at or below this fraction of Σ|g| is rounding noise.
const DEGENERATE_REL_FLOOR: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RgFlowParams {
    pub t_min: f64,
    pub t_max: f64,
    pub n_points: usize,
    pub decay: f64,
    pub pert_amp: f64,
    pub period: f64,
    pub g0: f64,
    pub window: bool,
}

impl Default for RgFlowParams {
    fn default() -> Self {
        Self {
            t_min: -35.0,
            t_max: 27.0,
            n_points: 1241,
            decay: 0.05,
            pert_amp: 0.5,
            period: 24.0,
            g0: 0.0,
            window: false,
        }
    }
}

impl RgFlowParams {
    pub fn validate(&self) -> Result<()> {
        require_finite("t_min", self.t_min)?;
        require_finite("t_max", self.t_max)?;
        require_finite("decay", self.decay)?;
        require_finite("pert_amp", self.pert_amp)?;
        require_finite("period", self.period)?;
        require_finite("g0", self.g0)?;
        if self.n_points < 2 {
            return Err(OctaveError::invalid(
                "n_points",
                format!("at least 2 points are required, got {}", self.n_points),
            ));
        }
        if self.t_max <= self.t_min {
            return Err(OctaveError::invalid(
                "t_max",
                format!("{} must exceed t_min {}", self.t_max, self.t_min),
            ));
        }
        if self.period <= 0.0 {
            return Err(OctaveError::invalid(
                "period",
                format!("must be positive, got {}", self.period),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn dt(&self) -> f64 {
        (self.t_max - self.t_min) / (self.n_points - 1) as f64
    }

    #[inline]
    fn beta(&self, t: f64, g: f64) -> f64 {
        -self.decay * g + self.pert_amp * (2.0 * PI * t / self.period).sin()
    }
}

/// Sampled coupling g(t) on the integration grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RgTrajectory {
    pub t: Vec<f64>,
    pub g: Vec<f64>,
}

impl RgTrajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.t.iter().copied().zip(self.g.iter().copied())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralPeak {
    pub bin: usize,
    pub frequency: f64,
    pub period: f64,
    pub magnitude: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RgFlowAnalysis {
    pub trajectory: RgTrajectory,
    pub dt: f64,
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
    pub dominant: SpectralPeak,
    /// Largest local spectral peaks, descending by magnitude.
    pub peaks: Vec<SpectralPeak>,
}

impl RgFlowAnalysis {
    #[inline]
    pub fn dominant_period(&self) -> f64 {
        self.dominant.period
    }

    /// Frequency resolution 1/(N·dt).
    #[inline]
    pub fn bin_width(&self) -> f64 {
        1.0 / (self.trajectory.len() as f64 * self.dt)
    }
}

/// Integrate the toy flow with RK4.
pub fn integrate(params: &RgFlowParams) -> Result<RgTrajectory> {
    params.validate()?;
    let n = params.n_points;
    let dt = params.dt();

    let t: Vec<f64> = (0..n).map(|k| params.t_min + k as f64 * dt).collect();
    let mut g = Vec::with_capacity(n);
    g.push(params.g0);
    for k in 1..n {
        let tp = t[k - 1];
        let gp = g[k - 1];
        let k1 = params.beta(tp, gp);
        let k2 = params.beta(tp + 0.5 * dt, gp + 0.5 * dt * k1);
        let k3 = params.beta(tp + 0.5 * dt, gp + 0.5 * dt * k2);
        let k4 = params.beta(tp + dt, gp + dt * k3);
        g.push(gp + dt / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4));
    }

    if let Some(bad) = g.iter().position(|v| !v.is_finite()) {
        return Err(OctaveError::degenerate(format!(
            "trajectory is not finite from t={:.3} (decay={}, period={})",
            t[bad], params.decay, params.period
        )));
    }
    Ok(RgTrajectory { t, g })
}

/// Index of the largest magnitude above DC; equal maxima keep the first.
pub(crate) fn dominant_bin(magnitudes: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for k in 1..magnitudes.len() {
        match best {
            Some(b) if magnitudes[k] <= magnitudes[b] => {}
            _ => best = Some(k),
        }
    }
    best
}

fn local_peaks(magnitudes: &[f64], min_height: f64) -> Vec<usize> {
    let n = magnitudes.len();
    let mut idx: Vec<usize> = (2..n.saturating_sub(1))
        .filter(|&k| {
            let m = magnitudes[k];
            m >= min_height && m > magnitudes[k - 1] && m >= magnitudes[k + 1]
        })
        .collect();
    idx.sort_by(|&a, &b| magnitudes[b].total_cmp(&magnitudes[a]));
    idx.truncate(MAX_REPORTED_PEAKS);
    idx
}

fn peak_at(bin: usize, frequencies: &[f64], magnitudes: &[f64]) -> SpectralPeak {
    let frequency = frequencies[bin];
    SpectralPeak {
        bin,
        frequency,
        period: 1.0 / frequency,
        magnitude: magnitudes[bin],
    }
}

/// Integrate, transform, and locate the dominant period.
pub fn analyze(params: &RgFlowParams) -> Result<RgFlowAnalysis> {
    let trajectory = integrate(params)?;
    let dt = params.dt();
    let n = trajectory.len();

    let mut y = trajectory.g.clone();
    remove_mean(&mut y);
    if params.window {
        apply_hann_window(&mut y);
    }
    let magnitudes = magnitude_spectrum(&y);
    let frequencies = rfft_freqs(n, dt);

    // no absolute cutoff; the floor scales with Σ|g|
    let scale = trajectory.g.iter().map(|v| v.abs()).sum::<f64>();
    let dominant = match dominant_bin(&magnitudes) {
        Some(k) if magnitudes[k].is_finite() && magnitudes[k] > DEGENERATE_REL_FLOOR * scale => {
            peak_at(k, &frequencies, &magnitudes)
        }
        _ => {
            return Err(OctaveError::degenerate(
                "spectrum has no non-zero component above DC",
            ));
        }
    };

    let peaks = local_peaks(&magnitudes, PEAK_REL_HEIGHT * dominant.magnitude)
        .into_iter()
        .map(|k| peak_at(k, &frequencies, &magnitudes))
        .collect();

    debug!(
        target: "rg_flow",
        "N={n} dt={dt:.4} dominant bin {} f={:.6} period={:.3}",
        dominant.bin,
        dominant.frequency,
        dominant.period
    );

    Ok(RgFlowAnalysis {
        trajectory,
        dt,
        frequencies,
        magnitudes,
        dominant,
        peaks,
    })
}
