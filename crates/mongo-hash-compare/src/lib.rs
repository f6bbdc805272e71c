//! # mongo-hash-compare
//!
//! Content-digest comparison between two MongoDB clusters.
//!
//! This library checks whether a destination cluster holds the same data as a
//! source cluster after a migration or sync, using the server-side `dbHash`
//! command instead of reading documents:
//!
//! - **Collection** of database and collection digests from both clusters,
//!   concurrently, with per-probe timeouts and error isolation
//! - **Reconciliation** into an ordered list of comparison records
//! - **Aggregation** into per-kind counters and a PASS/FAIL verdict
//! - **Reports** as an XLSX workbook or a JSON document
//!
//! ## Example
//!
//! ```rust,no_run
//! use mongo_hash_compare::{report, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mongo_hash_compare::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let path = config.output_path(chrono::Local::now());
//!     let sink = report::sink_for(config.report.format, path);
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run(sink.as_ref()).await?;
//!     println!("Overall status: {}", result.verdict);
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod collector;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod verify;

// Re-exports for convenient access
pub use cluster::{ClusterClient, DbHashReply, MongoCluster};
pub use collector::{CollectorOptions, DigestCollector};
pub use config::{ClusterConfig, CollectionProbe, CompareConfig, Config, ReportConfig, ReportFormat};
pub use error::{CompareError, Result};
pub use orchestrator::{health_check, CompareResult, HealthCheckResult, Orchestrator};
pub use report::{JsonReportSink, Report, ReportSink, XlsxReportSink};
pub use verify::{
    ComparisonRecord, Digest, EntityKind, MatchStatus, Reconciler, Summary, Verdict,
};
