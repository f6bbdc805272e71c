//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CompareError;

/// Root configuration structure.
///
/// Cluster URIs may be left out of the file and supplied from the command
/// line or environment instead; [`Config::validate`] rejects them if empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cluster holding the reference data.
    #[serde(default)]
    pub source: ClusterConfig,

    /// Cluster being checked against the source.
    #[serde(default)]
    pub destination: ClusterConfig,

    /// Collection behavior.
    #[serde(default)]
    pub compare: CompareConfig,

    /// Report output.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Connection settings for one cluster.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// MongoDB connection string (`mongodb://` or `mongodb+srv://`).
    pub uri: String,

    /// Application name reported to the server (default: "mongo-hash-compare").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("uri", &self.redacted_uri())
            .field("app_name", &self.app_name)
            .finish()
    }
}

impl ClusterConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            app_name: None,
        }
    }

    /// Host portion of the URI, without scheme or credentials.
    pub fn display_host(&self) -> &str {
        let without_scheme = self
            .uri
            .split_once("://")
            .map_or(self.uri.as_str(), |(_, rest)| rest);
        without_scheme
            .rsplit_once('@')
            .map_or(without_scheme, |(_, hosts)| hosts)
    }

    /// URI with any user info replaced by `[REDACTED]`.
    pub fn redacted_uri(&self) -> String {
        match self.uri.split_once("://") {
            Some((scheme, rest)) if rest.contains('@') => {
                format!("{}://[REDACTED]@{}", scheme, self.display_host())
            }
            _ => self.uri.clone(),
        }
    }
}

/// How collection digests are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionProbe {
    /// Take collection digests from the database-level dbHash reply.
    #[default]
    Batched,

    /// Issue one dbHash per collection, isolating failures and timings.
    Individual,
}

impl FromStr for CollectionProbe {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batched" => Ok(CollectionProbe::Batched),
            "individual" => Ok(CollectionProbe::Individual),
            other => Err(CompareError::Config(format!(
                "collection probe must be 'batched' or 'individual', got '{}'",
                other
            ))),
        }
    }
}

/// Collection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Per-probe timeout in seconds (default: 600).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Server selection / connect timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Databases to skip in addition to admin/local/config.
    #[serde(default)]
    pub exclude_databases: Vec<String>,

    /// If non-empty, only these databases are compared.
    #[serde(default)]
    pub include_databases: Vec<String>,

    /// Collection digest strategy (default: batched).
    #[serde(default)]
    pub collection_probe: CollectionProbe,

    /// Collect source and destination concurrently (default: true).
    #[serde(default = "default_true")]
    pub parallel_clusters: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            exclude_databases: Vec::new(),
            include_databases: Vec::new(),
            collection_probe: CollectionProbe::default(),
            parallel_clusters: true,
        }
    }
}

impl CompareConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Styled spreadsheet with a comparison sheet and a summary sheet.
    #[default]
    Xlsx,

    /// Pretty-printed JSON document.
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" => Ok(ReportFormat::Xlsx),
            "json" => Ok(ReportFormat::Json),
            other => Err(CompareError::Config(format!(
                "report format must be 'xlsx' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// Report output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output path. A timestamped file name is generated when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Output format (default: xlsx).
    #[serde(default)]
    pub format: ReportFormat,
}

// Default value functions for serde
fn default_probe_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
