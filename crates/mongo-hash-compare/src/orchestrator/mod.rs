//! Comparison orchestrator - main workflow coordinator.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

use crate::cluster::{ClusterClient, MongoCluster};
use crate::collector::{CollectorOptions, DigestCollector};
use crate::config::{ClusterConfig, Config};
use crate::error::Result;
use crate::report::{Report, ReportSink};
use crate::verify::{ClusterDigests, ComparisonRecord, Reconciler, Summary, Verdict};

/// Comparison orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn ClusterClient>,
    destination: Arc<dyn ClusterClient>,
}

/// Result of a comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Databases collected from the source.
    pub source_databases: usize,

    /// Databases collected from the destination.
    pub destination_databases: usize,

    /// Rolled-up counters.
    pub summary: Summary,

    /// PASS or FAIL.
    pub verdict: Verdict,

    /// Report location, once written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,

    /// Ordered comparison records.
    pub records: Vec<ComparisonRecord>,
}

/// Result of a connectivity check against both clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
    pub destination_connected: bool,
    pub destination_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_error: Option<String>,
    pub healthy: bool,
}

impl Orchestrator {
    /// Connect to both clusters. Fails fast if either is unreachable.
    pub async fn new(config: Config) -> Result<Self> {
        let timeout = config.compare.connect_timeout();
        let source = MongoCluster::connect("source", &config.source, timeout).await?;
        let destination = MongoCluster::connect("destination", &config.destination, timeout).await?;

        Ok(Self::with_clients(
            config,
            Arc::new(source),
            Arc::new(destination),
        ))
    }

    /// Build from already-connected clients.
    pub fn with_clients(
        config: Config,
        source: Arc<dyn ClusterClient>,
        destination: Arc<dyn ClusterClient>,
    ) -> Self {
        Self {
            config,
            source,
            destination,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Collect from both clusters, reconcile and aggregate.
    pub async fn compare(&self) -> Result<CompareResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        let (source, destination) = self.collect_both().await?;
        if source.is_empty() && destination.is_empty() {
            warn!("No user databases found on either cluster");
        }

        let records = Reconciler::new(info_span!("reconcile")).reconcile(&source, &destination);
        let summary = Summary::from_records(&records);
        let verdict = summary.verdict();

        Ok(CompareResult {
            started_at,
            completed_at: Utc::now(),
            duration_seconds: start.elapsed().as_secs_f64(),
            source_databases: source.len(),
            destination_databases: destination.len(),
            summary,
            verdict,
            report_path: None,
            records,
        })
    }

    /// Compare and write the report. Nothing is written if collection fails.
    pub async fn run(&self, sink: &dyn ReportSink) -> Result<CompareResult> {
        let mut result = self.compare().await?;

        let report = Report {
            generated_at: Local::now(),
            records: &result.records,
            summary: &result.summary,
        };
        sink.write(&report)?;
        result.report_path = Some(sink.path().to_path_buf());

        result.log_summary();
        Ok(result)
    }

    async fn collect_both(&self) -> Result<(ClusterDigests, ClusterDigests)> {
        let options = CollectorOptions::from(&self.config.compare);
        let source = DigestCollector::new(
            self.source.clone(),
            options.clone(),
            info_span!("collect", cluster = "source"),
        );
        let destination = DigestCollector::new(
            self.destination.clone(),
            options,
            info_span!("collect", cluster = "destination"),
        );

        if self.config.compare.parallel_clusters {
            info!("Collecting hashes from both clusters concurrently...");
            // The first fatal error drops the other cluster's collection
            tokio::try_join!(source.collect(), destination.collect())
        } else {
            info!("Collecting hashes from source cluster...");
            let src = source.collect().await?;
            info!("Collecting hashes from destination cluster...");
            let dst = destination.collect().await?;
            Ok((src, dst))
        }
    }
}

/// Ping both clusters without failing on the first error.
pub async fn health_check(config: &Config) -> HealthCheckResult {
    let timeout = config.compare.connect_timeout();
    let (source, destination) = tokio::join!(
        probe_connection("source", &config.source, timeout),
        probe_connection("destination", &config.destination, timeout),
    );

    HealthCheckResult {
        source_connected: source.0,
        source_latency_ms: source.1,
        source_error: source.2,
        destination_connected: destination.0,
        destination_latency_ms: destination.1,
        destination_error: destination.2,
        healthy: source.0 && destination.0,
    }
}

async fn probe_connection(
    label: &str,
    cluster: &ClusterConfig,
    timeout: std::time::Duration,
) -> (bool, u64, Option<String>) {
    let start = Instant::now();
    match MongoCluster::connect(label, cluster, timeout).await {
        Ok(_) => (true, start.elapsed().as_millis() as u64, None),
        Err(e) => (false, start.elapsed().as_millis() as u64, Some(e.to_string())),
    }
}

impl CompareResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Log the summary table.
    pub fn log_summary(&self) {
        let s = &self.summary;
        info!("=== COMPARISON SUMMARY ===");
        info!("Total Databases: {}", s.databases.total);
        info!("Database Mismatches: {}", s.databases.mismatches);
        info!("Missing Databases: {}", s.databases.missing);
        if s.databases.unverified > 0 {
            info!("Unverified Databases: {}", s.databases.unverified);
        }
        info!("Total Collections: {}", s.collections.total);
        info!("Collection Mismatches: {}", s.collections.mismatches);
        info!("Missing Collections: {}", s.collections.missing);
        if s.collections.unverified > 0 {
            info!("Unverified Collections: {}", s.collections.unverified);
        }
        info!("Overall Status: {}", self.verdict);
    }
}
