//! MongoDB driver implementation of [`ClusterClient`].

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{ClusterClient, DbHashReply};
use crate::config::ClusterConfig;
use crate::error::{CompareError, Result};

const APP_NAME: &str = "mongo-hash-compare";

/// `Unauthorized` server error code.
const UNAUTHORIZED: i32 = 13;

/// A connected MongoDB deployment.
pub struct MongoCluster {
    label: String,
    client: Client,
}

impl MongoCluster {
    /// Connect and ping `admin`. Any failure here is fatal for the run.
    pub async fn connect(
        label: impl Into<String>,
        config: &ClusterConfig,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let label = label.into();
        info!("Connecting to {} cluster {}", label, config.display_host());

        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| CompareError::connection(&label, e.to_string()))?;
        options.server_selection_timeout = Some(connect_timeout);
        options.connect_timeout = Some(connect_timeout);
        if options.app_name.is_none() {
            options.app_name = Some(config.app_name.clone().unwrap_or_else(|| APP_NAME.into()));
        }

        let client = Client::with_options(options)
            .map_err(|e| CompareError::connection(&label, e.to_string()))?;
        let cluster = Self { label, client };

        let latency = cluster.ping().await?;
        info!(
            "{} cluster connection successful ({}ms)",
            cluster.label,
            latency.as_millis()
        );
        Ok(cluster)
    }

    /// Map a driver error at connection time to the fatal taxonomy.
    fn connect_error(&self, err: mongodb::error::Error) -> CompareError {
        if is_auth_error(&err) {
            CompareError::authorization(&self.label, err.to_string())
        } else {
            CompareError::connection(&self.label, err.to_string())
        }
    }
}

#[async_trait]
impl ClusterClient for MongoCluster {
    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| self.connect_error(e))?;
        Ok(start.elapsed())
    }

    async fn list_database_names(&self) -> Result<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(|e| CompareError::listing(&self.label, e.to_string()))
    }

    async fn db_hash(&self, database: &str, collections: Option<&[String]>) -> Result<DbHashReply> {
        let mut command = doc! { "dbHash": 1 };
        if let Some(names) = collections {
            command.insert("collections", names.to_vec());
        }

        debug!("Running dbHash on {} ({})", database, self.label);
        let reply = self
            .client
            .database(database)
            .run_command(command)
            .await
            .map_err(|e| CompareError::probe(database, e.to_string()))?;

        parse_db_hash(database, &reply)
    }
}

fn is_auth_error(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Authentication { .. } => true,
        ErrorKind::Command(cmd) => cmd.code == UNAUTHORIZED,
        _ => false,
    }
}

/// Extract the fields we use from a raw `dbHash` reply.
fn parse_db_hash(database: &str, reply: &Document) -> Result<DbHashReply> {
    let md5 = reply
        .get_str("md5")
        .map_err(|_| CompareError::probe(database, "dbHash reply has no md5 field"))?
        .to_string();
    let host = reply.get_str("host").unwrap_or("unknown").to_string();
    let time_millis = reply.get("timeMillis").and_then(bson_to_u64).unwrap_or(0);

    let mut collections = BTreeMap::new();
    if let Ok(hashes) = reply.get_document("collections") {
        for (name, value) in hashes {
            if let Some(hash) = value.as_str() {
                collections.insert(name.clone(), hash.to_string());
            }
        }
    }

    Ok(DbHashReply {
        md5,
        host,
        time_millis,
        collections,
    })
}

fn bson_to_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reply() {
        let reply = doc! {
            "host": "shard0:27017",
            "collections": { "orders": "aaa", "users": "bbb" },
            "capped": [],
            "uuids": {},
            "md5": "f00d",
            "timeMillis": 42,
            "ok": 1.0,
        };
        let parsed = parse_db_hash("shop", &reply).unwrap();
        assert_eq!(parsed.md5, "f00d");
        assert_eq!(parsed.host, "shard0:27017");
        assert_eq!(parsed.time_millis, 42);
        assert_eq!(parsed.collections.len(), 2);
        assert_eq!(parsed.collections["users"], "bbb");
    }

    #[test]
    fn test_parse_reply_defaults() {
        let reply = doc! { "md5": "f00d", "timeMillis": 7_i64 };
        let parsed = parse_db_hash("shop", &reply).unwrap();
        assert_eq!(parsed.host, "unknown");
        assert_eq!(parsed.time_millis, 7);
        assert!(parsed.collections.is_empty());
    }

    #[test]
    fn test_parse_reply_without_md5_is_probe_error() {
        let err = parse_db_hash("shop", &doc! { "ok": 1.0 }).unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("shop"));
    }

    #[test]
    fn test_negative_time_is_dropped() {
        assert_eq!(bson_to_u64(&Bson::Int32(-1)), None);
        assert_eq!(bson_to_u64(&Bson::Double(3.9)), Some(3));
    }
}
