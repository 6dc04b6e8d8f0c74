// src/config.rs
use crate::error::PoseError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    // Same for every joint, whatever finger it belongs to
    pub joint_weight: f64,

    // Per unit of total weight
    pub degenerate_epsilon: f64,

    pub initial_pool_capacity: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            joint_weight: 1.0,
            degenerate_epsilon: 1e-12,
            initial_pool_capacity: 2,
        }
    }
}

impl SolverConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read solver config {}", path.display()))?;
        let config: SolverConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse solver config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write solver config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), PoseError> {
        if !self.joint_weight.is_finite() || self.joint_weight <= 0.0 {
            return Err(PoseError::Config(format!(
                "joint_weight must be finite and > 0, got {}",
                self.joint_weight
            )));
        }
        if !self.degenerate_epsilon.is_finite() || self.degenerate_epsilon < 0.0 {
            return Err(PoseError::Config(format!(
                "degenerate_epsilon must be finite and >= 0, got {}",
                self.degenerate_epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        SolverConfig::default()
            .validate()
            .expect("default config should be valid");
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("solver.json");

        let mut original = SolverConfig::default();
        original.joint_weight = 2.5;
        original.to_json_file(&path).unwrap();

        let loaded = SolverConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("partial.json");
        std::fs::write(&path, r#"{ "initial_pool_capacity": 4 }"#).unwrap();

        let loaded = SolverConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.initial_pool_capacity, 4);
        assert_eq!(loaded.joint_weight, 1.0);
    }

    #[test]
    fn non_positive_weight_is_invalid() {
        let mut cfg = SolverConfig::default();
        cfg.joint_weight = 0.0;
        assert!(cfg.validate().is_err());
        cfg.joint_weight = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_file_is_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, r#"{ "joint_weight": -1.0 }"#).unwrap();
        assert!(SolverConfig::from_json_file(&path).is_err());
    }
}
