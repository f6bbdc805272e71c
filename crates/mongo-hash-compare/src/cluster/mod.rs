//! Cluster access used by the digest collector.
//!
//! [`ClusterClient`] is the only seam between the comparison engine and a
//! live deployment. It covers database enumeration and the server-side
//! `dbHash` probe; [`MongoCluster`] implements it on the MongoDB driver, and
//! tests substitute in-memory fakes.

mod mongo;

pub use mongo::MongoCluster;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;

/// Databases that are never compared.
pub const SYSTEM_DATABASES: [&str; 3] = ["admin", "local", "config"];

/// Parsed `dbHash` command reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbHashReply {
    /// Digest over every hashed collection in scope.
    pub md5: String,
    /// Host that served the command.
    pub host: String,
    /// Server-side execution time.
    pub time_millis: u64,
    /// Per-collection digests.
    pub collections: BTreeMap<String, String>,
}

/// Read-only access to one cluster.
///
/// Implementations must be `Send + Sync` so both clusters can be collected
/// concurrently.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Short name for diagnostics ("source", "destination").
    fn label(&self) -> &str;

    /// Round-trip a ping to the deployment.
    async fn ping(&self) -> Result<Duration>;

    /// Every database name the server reports, system databases included.
    ///
    /// Failure is fatal for the run and should be reported as
    /// [`crate::CompareError::Listing`].
    async fn list_database_names(&self) -> Result<Vec<String>>;

    /// Run `dbHash` on `database`, optionally restricted to `collections`.
    async fn db_hash(&self, database: &str, collections: Option<&[String]>) -> Result<DbHashReply>;
}

/// Whether a database is reserved by the server.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}
