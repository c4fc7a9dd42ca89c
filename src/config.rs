//! Configuration layering: CLI flags > config file > built-in defaults.
//!
//! Mirrors the teacher's "pure core, imperative shell" split: the I/O
//! (reading the TOML file) happens once in the CLI shell; everything
//! else here is a pure merge.

use crate::accumulation::AccumulationConfig;
use crate::error::CompareError;
use crate::types::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional on-disk defaults for repeated batch comparisons (spec
/// SPEC_FULL §A.3). Every field is optional; CLI arguments always win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub significant: Option<f64>,
    pub critical: Option<f64>,
    pub print_threshold: Option<f64>,
    pub min_points: Option<usize>,
    pub slope_threshold: Option<f64>,
    pub r2_threshold: Option<f64>,
    pub autocorr_threshold: Option<f64>,
    pub bias_threshold: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: FileConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

/// CLI-supplied positional values and the flag overrides relevant to
/// configuration resolution. `significant`/`critical`/`print_threshold`
/// are optional on the command line so a `--config` file can supply them
/// for repeated batch comparisons (SPEC_FULL §A.3).
#[derive(Debug, Clone, Copy)]
pub struct CliThresholds {
    pub significant: Option<f64>,
    pub critical: Option<f64>,
    pub print_threshold: Option<f64>,
    pub min_points: Option<usize>,
}

/// Merge CLI, file, and built-in defaults into the values the rest of the
/// pipeline consumes: CLI wins over the config file, which wins over
/// built-in defaults. `significant` and `critical` have no built-in
/// default (they gate the verdict directly), so omitting both is a fatal
/// configuration error; `print_threshold` falls back to `0.0`.
pub fn resolve_thresholds(
    cli: CliThresholds,
    file: Option<&FileConfig>,
) -> Result<Thresholds, CompareError> {
    let significant = cli
        .significant
        .or_else(|| file.and_then(|f| f.significant))
        .ok_or_else(|| {
            CompareError::Config(
                "significant threshold not supplied on the command line or config file".into(),
            )
        })?;
    let critical = cli
        .critical
        .or_else(|| file.and_then(|f| f.critical))
        .ok_or_else(|| {
            CompareError::Config(
                "critical threshold not supplied on the command line or config file".into(),
            )
        })?;
    let print = cli
        .print_threshold
        .or_else(|| file.and_then(|f| f.print_threshold))
        .unwrap_or(0.0);
    Ok(Thresholds::new(significant, critical, print))
}

/// Resolve the accumulation-analyzer tuning constants, letting the config
/// file override the defaults and the CLI override the file.
pub fn resolve_accumulation_config(
    cli_min_points: Option<usize>,
    file: Option<&FileConfig>,
) -> AccumulationConfig {
    let mut config = AccumulationConfig::default();
    if let Some(f) = file {
        if let Some(v) = f.min_points {
            config.min_points = v;
        }
        if let Some(v) = f.slope_threshold {
            config.slope_threshold = v;
        }
        if let Some(v) = f.r2_threshold {
            config.r2_threshold = v;
        }
        if let Some(v) = f.autocorr_threshold {
            config.autocorr_threshold = v;
        }
        if let Some(v) = f.bias_threshold {
            config.bias_threshold = v;
        }
    }
    if let Some(v) = cli_min_points {
        config.min_points = v;
    }
    config
}
