use crate::core::delta_scan::ScanGrid;
use crate::core::force_clustering::{DEFAULT_SMOKE_TRIALS, DEFAULT_SPECULATIVE, PairingMode};
use crate::core::rg_flow::RgFlowParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// An existing config file that cannot be used. A missing file is not an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default = "TestConfig::default_delta")]
    pub delta: f64,
    #[serde(default = "TestConfig::default_threshold")]
    pub threshold: f64,
    #[serde(default = "TestConfig::default_n_trials")]
    pub n_trials: usize,
    #[serde(default = "TestConfig::default_smoke_trials")]
    pub smoke_trials: usize,
    #[serde(default = "TestConfig::default_seed")]
    pub seed: u64,
}

impl TestConfig {
    fn default_delta() -> f64 {
        24.0
    }
    fn default_threshold() -> f64 {
        0.2
    }
    fn default_n_trials() -> usize {
        200_000
    }
    fn default_smoke_trials() -> usize {
        DEFAULT_SMOKE_TRIALS
    }
    fn default_seed() -> u64 {
        42
    }

    /// Trial count after the smoke cap.
    pub fn trials(&self, smoke: bool) -> usize {
        if smoke {
            self.n_trials.min(self.smoke_trials)
        } else {
            self.n_trials
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            delta: Self::default_delta(),
            threshold: Self::default_threshold(),
            n_trials: Self::default_n_trials(),
            smoke_trials: Self::default_smoke_trials(),
            seed: Self::default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "ScanConfig::default_delta_min")]
    pub delta_min: f64,
    #[serde(default = "ScanConfig::default_delta_max")]
    pub delta_max: f64,
    #[serde(default = "ScanConfig::default_step")]
    pub step: f64,
}

impl ScanConfig {
    fn default_delta_min() -> f64 {
        22.0
    }
    fn default_delta_max() -> f64 {
        26.0
    }
    fn default_step() -> f64 {
        0.05
    }

    pub fn grid(&self) -> ScanGrid {
        ScanGrid {
            delta_min: self.delta_min,
            delta_max: self.delta_max,
            step: self.step,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            delta_min: Self::default_delta_min(),
            delta_max: Self::default_delta_max(),
            step: Self::default_step(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceConfig {
    #[serde(default = "ForceConfig::default_scales_path")]
    pub scales_path: String,
    #[serde(default)]
    pub pairing: PairingMode,
    #[serde(default)]
    pub append_speculative: bool,
    #[serde(default = "ForceConfig::default_speculative")]
    pub speculative: Vec<f64>,
}

impl ForceConfig {
    fn default_scales_path() -> String {
        "data/force_scales.toml".to_string()
    }
    fn default_speculative() -> Vec<f64> {
        DEFAULT_SPECULATIVE.to_vec()
    }

    pub fn speculative_values(&self) -> Option<&[f64]> {
        self.append_speculative.then_some(self.speculative.as_slice())
    }
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            scales_path: Self::default_scales_path(),
            pairing: PairingMode::default(),
            append_speculative: false,
            speculative: Self::default_speculative(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgFlowConfig {
    #[serde(default = "RgFlowConfig::default_t_min")]
    pub t_min: f64,
    #[serde(default = "RgFlowConfig::default_t_max")]
    pub t_max: f64,
    #[serde(default = "RgFlowConfig::default_n_points")]
    pub n_points: usize,
    #[serde(default = "RgFlowConfig::default_decay")]
    pub decay: f64,
    #[serde(default = "RgFlowConfig::default_pert_amp")]
    pub pert_amp: f64,
    #[serde(default = "RgFlowConfig::default_period")]
    pub period: f64,
    #[serde(default)]
    pub g0: f64,
    #[serde(default)]
    pub window: bool,
}

impl RgFlowConfig {
    fn default_t_min() -> f64 {
        -35.0
    }
    fn default_t_max() -> f64 {
        27.0
    }
    fn default_n_points() -> usize {
        1241
    }
    fn default_decay() -> f64 {
        0.05
    }
    fn default_pert_amp() -> f64 {
        0.5
    }
    fn default_period() -> f64 {
        24.0
    }

    pub fn params(&self) -> RgFlowParams {
        RgFlowParams {
            t_min: self.t_min,
            t_max: self.t_max,
            n_points: self.n_points,
            decay: self.decay,
            pert_amp: self.pert_amp,
            period: self.period,
            g0: self.g0,
            window: self.window,
        }
    }
}

impl Default for RgFlowConfig {
    fn default() -> Self {
        Self {
            t_min: Self::default_t_min(),
            t_max: Self::default_t_max(),
            n_points: Self::default_n_points(),
            decay: Self::default_decay(),
            pert_amp: Self::default_pert_amp(),
            period: Self::default_period(),
            g0: 0.0,
            window: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub force: ForceConfig,
    #[serde(default)]
    pub rg_flow: RgFlowConfig,
}

impl AppConfig {
    fn round_f64(x: f64) -> f64 {
        (x * 1_000_000.0).round() / 1_000_000.0
    }

    fn format_f64_compact(x: f64) -> String {
        let mut s = format!("{:.6}", x);
        while s.contains('.') && s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        if s.is_empty() { "0".to_string() } else { s }
    }

    fn rounded(mut self) -> Self {
        self.test.delta = Self::round_f64(self.test.delta);
        self.test.threshold = Self::round_f64(self.test.threshold);
        self.scan.delta_min = Self::round_f64(self.scan.delta_min);
        self.scan.delta_max = Self::round_f64(self.scan.delta_max);
        self.scan.step = Self::round_f64(self.scan.step);
        self.rg_flow.decay = Self::round_f64(self.rg_flow.decay);
        self.rg_flow.pert_amp = Self::round_f64(self.rg_flow.pert_amp);
        self.rg_flow.period = Self::round_f64(self.rg_flow.period);
        self
    }

    /// Read `path`, or write commented defaults there when it does not exist.
    pub fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            let contents = fs::read_to_string(path_obj).map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
            return toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            });
        }

        // File does not exist: write commented defaults and return them.
        let default_cfg = Self::default().rounded();
        if let Ok(text) = toml::to_string_pretty(&default_cfg) {
            let mut commented = String::new();
            for line in text.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    commented.push('\n');
                } else if trimmed.starts_with('[') && trimmed.ends_with(']') && !line.contains('=')
                {
                    commented.push_str(line);
                    commented.push('\n');
                } else {
                    let mut out_line = line.to_string();
                    if let Some((lhs, rhs)) = line.split_once('=') {
                        let rhs_trim = rhs.trim();
                        let has_decimal = rhs_trim.contains('.');
                        if (has_decimal || rhs_trim.contains('e') || rhs_trim.contains('E'))
                            && !rhs_trim.contains('"')
                            && rhs_trim != "true"
                            && rhs_trim != "false"
                        {
                            if let Ok(val) = rhs_trim.parse::<f64>() {
                                let mut formatted = Self::format_f64_compact(val);
                                if has_decimal && !formatted.contains('.') {
                                    formatted.push_str(".0");
                                }
                                out_line = format!("{} = {}", lhs.trim(), formatted);
                            }
                        }
                    }
                    commented.push_str("# ");
                    commented.push_str(&out_line);
                    commented.push('\n');
                }
            }
            if let Err(err) = fs::write(path_obj, commented) {
                warn!("Failed to write default config to {path}: {err}");
            }
        } else {
            warn!("Failed to serialize default config; continuing with defaults");
        }
        Ok(default_cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "cosmic_octaves_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn load_or_default_writes_defaults_cleanly() {
        let path = unique_path("defaults.toml");
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let cfg = AppConfig::load_or_default(&path_str).unwrap();
        assert!(path.exists(), "config file should be created");
        assert_eq!(cfg.test.delta, 24.0);
        assert_eq!(cfg.test.threshold, 0.2);
        assert_eq!(cfg.test.n_trials, 200_000);
        assert_eq!(cfg.test.smoke_trials, 2_000);
        assert_eq!(cfg.test.seed, 42);
        assert_eq!(cfg.scan.step, 0.05);
        assert_eq!(cfg.force.pairing, PairingMode::Canonical);
        assert!(!cfg.force.append_speculative);
        assert_eq!(cfg.rg_flow.n_points, 1241);
        assert!(!cfg.rg_flow.window);

        let contents = fs::read_to_string(&path).expect("read written config");
        assert!(contents.contains("[test]"), "section headers stay live");
        assert!(
            contents.contains("# threshold = 0.2"),
            "should write commented threshold"
        );
        assert!(
            contents.contains("# delta = 24.0"),
            "should write commented delta"
        );
        assert!(
            contents.contains("# step = 0.05"),
            "should write commented scan step"
        );
        assert!(
            contents.contains("# window = false"),
            "should write commented window flag"
        );

        // The commented file must parse back to the same defaults.
        let reread = AppConfig::load_or_default(&path_str).unwrap();
        assert_eq!(reread.test.n_trials, 200_000);
        assert_eq!(reread.rg_flow.period, 24.0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_default_reads_existing() {
        let path = unique_path("custom.toml");
        let path_str = path.to_string_lossy().to_string();
        let custom = AppConfig {
            test: TestConfig {
                delta: 23.5,
                threshold: 0.1,
                n_trials: 5_000,
                smoke_trials: 50,
                seed: 7,
            },
            scan: ScanConfig {
                delta_min: 20.0,
                delta_max: 28.0,
                step: 0.1,
            },
            force: ForceConfig {
                scales_path: "elsewhere.toml".to_string(),
                pairing: PairingMode::CrossDomain,
                append_speculative: true,
                speculative: vec![21.0],
            },
            rg_flow: RgFlowConfig {
                window: true,
                n_points: 512,
                ..RgFlowConfig::default()
            },
        };
        let text = toml::to_string_pretty(&custom).unwrap();
        fs::write(&path, text).unwrap();

        let cfg = AppConfig::load_or_default(&path_str).unwrap();
        assert_eq!(cfg.test.delta, 23.5);
        assert_eq!(cfg.test.threshold, 0.1);
        assert_eq!(cfg.test.trials(true), 50);
        assert_eq!(cfg.test.trials(false), 5_000);
        assert_eq!(cfg.test.seed, 7);
        assert_eq!(cfg.scan.grid().len(), 81);
        assert_eq!(cfg.force.pairing, PairingMode::CrossDomain);
        assert_eq!(cfg.force.speculative_values(), Some(&[21.0][..]));
        assert!(cfg.rg_flow.params().window);
        assert_eq!(cfg.rg_flow.params().n_points, 512);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = unique_path("broken.toml");
        fs::write(&path, "[test\ndelta = ").unwrap();
        let err = AppConfig::load_or_default(&path.to_string_lossy()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn negative_trial_count_is_rejected() {
        let path = unique_path("negative_trials.toml");
        fs::write(&path, "[test]\nn_trials = -5\n").unwrap();
        let err = AppConfig::load_or_default(&path.to_string_lossy()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
        // the broken file is left in place, not overwritten with defaults
        assert!(fs::read_to_string(&path).unwrap().contains("-5"));
        let _ = fs::remove_file(&path);
    }
}
