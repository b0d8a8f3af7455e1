use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Cumulative-share cut-offs. A product is class A while its cumulative
/// share is `<= a`, class B while `<= b`, class C otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcThresholds {
    pub a: f64,
    pub b: f64,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self { a: 0.80, b: 0.95 }
    }
}

/// Hyper-parameters for the boosted-tree demand model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    pub min_child_weight: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorKind {
    GradientBoosting(BoostingParams),
    Linear,
}

impl Default for RegressorKind {
    fn default() -> Self {
        RegressorKind::GradientBoosting(BoostingParams::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub regressor: RegressorKind,
    pub grid_size: usize,
    pub low_multiplier: f64,
    pub high_multiplier: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            regressor: RegressorKind::default(),
            grid_size: 100,
            low_multiplier: 0.8,
            high_multiplier: 1.2,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            return Err(ReportError::InvalidConfig(format!(
                "optimizer.grid_size must be at least 2, got {}",
                self.grid_size
            )));
        }
        if !(self.low_multiplier > 0.0 && self.high_multiplier > 0.0) {
            return Err(ReportError::InvalidConfig(
                "optimizer price multipliers must be positive".to_string(),
            ));
        }
        if self.low_multiplier > self.high_multiplier {
            return Err(ReportError::InvalidConfig(format!(
                "optimizer.low_multiplier ({}) exceeds high_multiplier ({})",
                self.low_multiplier, self.high_multiplier
            )));
        }
        if let RegressorKind::GradientBoosting(p) = &self.regressor {
            if p.n_estimators == 0 || p.max_depth == 0 {
                return Err(ReportError::InvalidConfig(
                    "gradient boosting needs n_estimators >= 1 and max_depth >= 1".to_string(),
                ));
            }
            if !(p.learning_rate > 0.0) || p.lambda < 0.0 || p.min_child_weight < 0.0 {
                return Err(ReportError::InvalidConfig(
                    "gradient boosting needs learning_rate > 0, lambda >= 0, min_child_weight >= 0"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub thresholds: AbcThresholds,
    pub optimizer: OptimizerConfig,
    /// Seeds the pick of the charted class-A article; random when unset.
    pub chart_seed: Option<u64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("ventas.csv"),
            output_dir: PathBuf::from("resultado_abc"),
            thresholds: AbcThresholds::default(),
            optimizer: OptimizerConfig::default(),
            chart_seed: None,
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !(t.a > 0.0 && t.a <= t.b && t.b <= 1.0) {
            return Err(ReportError::InvalidConfig(format!(
                "thresholds must satisfy 0 < a <= b <= 1, got a={} b={}",
                t.a, t.b
            )));
        }
        self.optimizer.validate()
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReportConfig> {
    let content = fs::read_to_string(path)?;
    let config: ReportConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
