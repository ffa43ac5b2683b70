use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RefineError;
use crate::optimize::detect::DetectionMethod;

// ---------------------------------------------------------------------------
// OptimizerConfig
// ---------------------------------------------------------------------------

/// Campaign configuration. Loaded from a JSON file layered over defaults;
/// unknown keys are ignored, out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Floor on rows for a dataset to stay eligible for reduction.
    pub min_data_points: usize,
    /// Budget of rounds (of either kind) per campaign.
    pub max_outlier_rounds: u32,
    /// Minimum fraction of the original dataset that must survive, in (0, 1].
    pub data_retention_threshold: f64,
    /// Target uniformity in percent; at or below this the campaign converges.
    pub uniformity_threshold: f64,
    /// Headless operation: no confirmation gate, progress hook instead.
    pub batch_mode: bool,
    pub method: DetectionMethod,
    /// Score cut for the plain z-score method.
    pub z_threshold: f64,
    /// Score cut for the modified z-score method.
    pub modified_z_threshold: f64,
    /// Lowest-thickness samples removed per fallback round.
    pub min_removal_count: usize,
    pub wafer_diameter_mm: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            min_data_points: 10,
            max_outlier_rounds: 20,
            data_retention_threshold: 0.3,
            uniformity_threshold: 5.0,
            batch_mode: false,
            method: DetectionMethod::Iqr,
            z_threshold: 3.0,
            modified_z_threshold: 3.5,
            min_removal_count: 1,
            wafer_diameter_mm: 200.0,
        }
    }
}

impl OptimizerConfig {
    pub fn wafer_radius(&self) -> f64 {
        self.wafer_diameter_mm / 2.0
    }

    /// Load from a JSON file. A missing file yields the defaults; a present
    /// file must parse and validate.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid option values at construction time.
    pub fn validate(&self) -> Result<(), RefineError> {
        if self.min_data_points < 4 {
            return Err(RefineError::Configuration(format!(
                "min_data_points must be at least 4, got {}",
                self.min_data_points
            )));
        }
        if self.max_outlier_rounds == 0 {
            return Err(RefineError::Configuration(
                "max_outlier_rounds must be at least 1".into(),
            ));
        }
        if !(self.data_retention_threshold > 0.0 && self.data_retention_threshold <= 1.0) {
            return Err(RefineError::Configuration(format!(
                "data_retention_threshold must be in (0, 1], got {}",
                self.data_retention_threshold
            )));
        }
        if !(self.uniformity_threshold > 0.0 && self.uniformity_threshold.is_finite()) {
            return Err(RefineError::Configuration(format!(
                "uniformity_threshold must be a positive percentage, got {}",
                self.uniformity_threshold
            )));
        }
        if self.z_threshold <= 0.0 || self.modified_z_threshold <= 0.0 {
            return Err(RefineError::Configuration(
                "score thresholds must be positive".into(),
            ));
        }
        if self.min_removal_count == 0 {
            return Err(RefineError::Configuration(
                "min_removal_count must be at least 1".into(),
            ));
        }
        if !(self.wafer_diameter_mm > 0.0) {
            return Err(RefineError::Configuration(format!(
                "wafer_diameter_mm must be positive, got {}",
                self.wafer_diameter_mm
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = OptimizerConfig::load(Path::new("/nonexistent/app_config.json")).unwrap();
        assert_eq!(cfg.min_data_points, 10);
        assert_eq!(cfg.method, DetectionMethod::Iqr);
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(br#"{"uniformity_threshold": 2.5, "method": "modified_z_score"}"#)
            .unwrap();

        let cfg = OptimizerConfig::load(&path).unwrap();
        assert_eq!(cfg.uniformity_threshold, 2.5);
        assert_eq!(cfg.method, DetectionMethod::ModifiedZScore);
        // untouched keys keep their defaults
        assert_eq!(cfg.max_outlier_rounds, 20);
    }

    #[test]
    fn out_of_range_retention_is_rejected_not_clamped() {
        let cfg = OptimizerConfig {
            data_retention_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            RefineError::Configuration(_)
        ));
    }

    #[test]
    fn zero_rounds_rejected() {
        let cfg = OptimizerConfig {
            max_outlier_rounds: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
