//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::error::{CompareError, Result};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file without validating it, so overrides can be applied first.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CompareError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from two connection strings with default options.
    pub fn from_uris(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: ClusterConfig::new(source),
            destination: ClusterConfig::new(destination),
            compare: CompareConfig::default(),
            report: ReportConfig::default(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Report path: the configured one, or a timestamped name in the working directory.
    pub fn output_path(&self, now: DateTime<Local>) -> PathBuf {
        self.report.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "mongodb_hash_comparison_{}.{}",
                now.format("%Y%m%d_%H%M%S"),
                self.report.format.extension()
            ))
        })
    }
}
