//! Digest collection for one cluster.
//!
//! The collector enumerates user databases and probes each one with
//! `dbHash`. Probes run one at a time: `dbHash` takes a shared lock on the
//! database, and concurrent calls on the same cluster distort the reported
//! timings. A failing or timed-out probe becomes [`Digest::Errored`] for
//! that entity only; failing to list databases aborts collection.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument, Span};

use crate::cluster::{is_system_database, ClusterClient, DbHashReply};
use crate::config::{CollectionProbe, CompareConfig};
use crate::error::{CompareError, Result};
use crate::verify::{ClusterDigests, DatabaseDigests, Digest};

/// Options controlling what is collected and how.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Extra databases to skip.
    pub exclude_databases: Vec<String>,
    /// If non-empty, only these databases are collected.
    pub include_databases: Vec<String>,
    /// Upper bound for each probe.
    pub probe_timeout: Duration,
    /// Collection digest strategy.
    pub collection_probe: CollectionProbe,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        CollectorOptions::from(&CompareConfig::default())
    }
}

impl From<&CompareConfig> for CollectorOptions {
    fn from(config: &CompareConfig) -> Self {
        Self {
            exclude_databases: config.exclude_databases.clone(),
            include_databases: config.include_databases.clone(),
            probe_timeout: config.probe_timeout(),
            collection_probe: config.collection_probe,
        }
    }
}

/// Collects database and collection digests from one cluster.
pub struct DigestCollector {
    client: Arc<dyn ClusterClient>,
    options: CollectorOptions,
    span: Span,
}

impl DigestCollector {
    /// Create a collector that logs inside `span`.
    pub fn new(client: Arc<dyn ClusterClient>, options: CollectorOptions, span: Span) -> Self {
        Self {
            client,
            options,
            span,
        }
    }

    /// Sorted, de-duplicated user database names.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .client
            .list_database_names()
            .await?
            .into_iter()
            .filter(|name| self.wants(name))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn wants(&self, name: &str) -> bool {
        if is_system_database(name) || self.options.exclude_databases.iter().any(|n| n == name) {
            return false;
        }
        self.options.include_databases.is_empty()
            || self.options.include_databases.iter().any(|n| n == name)
    }

    /// Collect every digest. Only a listing failure is returned as an error.
    pub async fn collect(&self) -> Result<ClusterDigests> {
        async {
            let start = Instant::now();
            let databases = self.list_databases().await?;
            info!(
                "Found {} non-system databases on {}: {:?}",
                databases.len(),
                self.client.label(),
                databases
            );

            let mut digests = ClusterDigests::new();
            for name in databases {
                let entry = self.collect_database(&name).await;
                digests.insert(name, entry);
            }

            let errored = digests
                .values()
                .filter(|d| matches!(d.digest, Digest::Errored { .. }))
                .count();
            info!(
                "Collected hashes for {} {} databases in {}ms ({} errored)",
                digests.len(),
                self.client.label(),
                start.elapsed().as_millis(),
                errored
            );
            Ok(digests)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn collect_database(&self, database: &str) -> DatabaseDigests {
        info!("Running dbHash on database: {}", database);
        let reply = match self
            .bounded(database, self.client.db_hash(database, None))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!("dbHash failed on {} ({}): {}", database, self.client.label(), err);
                return DatabaseDigests::new(Digest::errored(reason(err)));
            }
        };

        info!(
            "dbHash completed for {} in {}ms, {} collections",
            database,
            reply.time_millis,
            reply.collections.len()
        );

        let mut entry = DatabaseDigests::new(Digest::present(
            reply.md5.clone(),
            Some(reply.time_millis),
            Some(reply.host.clone()),
        ));

        match self.options.collection_probe {
            CollectionProbe::Batched => {
                for (name, md5) in &reply.collections {
                    entry.collections.insert(
                        name.clone(),
                        Digest::present(md5.clone(), None, Some(reply.host.clone())),
                    );
                }
            }
            CollectionProbe::Individual => {
                for name in reply.collections.keys() {
                    let digest = self.probe_collection(database, name).await;
                    entry.collections.insert(name.clone(), digest);
                }
            }
        }

        entry
    }

    async fn probe_collection(&self, database: &str, collection: &str) -> Digest {
        let entity = format!("{}.{}", database, collection);
        let scope = [collection.to_string()];
        let result: Result<DbHashReply> = self
            .bounded(&entity, self.client.db_hash(database, Some(&scope[..])))
            .await;

        match result {
            Ok(reply) => match reply.collections.get(collection) {
                Some(md5) => {
                    debug!("dbHash completed for {} in {}ms", entity, reply.time_millis);
                    Digest::present(md5.clone(), Some(reply.time_millis), Some(reply.host))
                }
                None => {
                    warn!("{} disappeared between probes", entity);
                    Digest::errored("collection not returned by dbHash")
                }
            },
            Err(err) => {
                warn!("dbHash failed on {} ({}): {}", entity, self.client.label(), err);
                Digest::errored(reason(err))
            }
        }
    }

    /// Apply the probe timeout and classify failures as probe errors.
    async fn bounded<T>(&self, entity: &str, probe: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.options.probe_timeout, probe).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(match err {
                err @ CompareError::Probe { .. } => err,
                other => CompareError::probe(entity, other.to_string()),
            }),
            Err(_) => Err(CompareError::probe(
                entity,
                format!("timed out after {}s", self.options.probe_timeout.as_secs()),
            )),
        }
    }
}

/// Error text kept in the digest.
fn reason(err: CompareError) -> String {
    match err {
        CompareError::Probe { message, .. } => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    /// In-memory cluster with scripted failures.
    #[derive(Default)]
    struct FakeCluster {
        databases: BTreeMap<String, BTreeMap<String, String>>,
        failing: HashSet<String>,
        hanging: HashSet<String>,
        vanishing: HashSet<String>,
        listing_fails: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCluster {
        fn with_db(mut self, name: &str, collections: &[(&str, &str)]) -> Self {
            self.databases.insert(
                name.to_string(),
                collections
                    .iter()
                    .map(|(c, h)| (c.to_string(), h.to_string()))
                    .collect(),
            );
            self
        }

        fn failing(mut self, entity: &str) -> Self {
            self.failing.insert(entity.to_string());
            self
        }

        fn hanging(mut self, entity: &str) -> Self {
            self.hanging.insert(entity.to_string());
            self
        }

        /// Scoped replies for `entity` leave the collection out.
        fn vanishing(mut self, entity: &str) -> Self {
            self.vanishing.insert(entity.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterClient for FakeCluster {
        fn label(&self) -> &str {
            "fake"
        }

        async fn ping(&self) -> Result<Duration> {
            Ok(Duration::from_millis(1))
        }

        async fn list_database_names(&self) -> Result<Vec<String>> {
            if self.listing_fails {
                return Err(CompareError::listing("fake", "not authorized on admin"));
            }
            Ok(self.databases.keys().cloned().collect())
        }

        async fn db_hash(
            &self,
            database: &str,
            collections: Option<&[String]>,
        ) -> Result<DbHashReply> {
            let entity = match collections {
                Some([one]) => format!("{}.{}", database, one),
                _ => database.to_string(),
            };
            self.calls.lock().unwrap().push(entity.clone());

            if self.hanging.contains(&entity) {
                std::future::pending::<()>().await;
            }
            if self.failing.contains(&entity) {
                return Err(CompareError::probe(&entity, "not authorized"));
            }

            let all = self.databases.get(database).cloned().unwrap_or_default();
            let hashes: BTreeMap<String, String> = match collections {
                Some(_) if self.vanishing.contains(&entity) => BTreeMap::new(),
                Some(names) => all
                    .into_iter()
                    .filter(|(name, _)| names.contains(name))
                    .collect(),
                None => all,
            };
            let md5 = hashes.values().cloned().collect::<Vec<_>>().join("+");
            Ok(DbHashReply {
                md5,
                host: "fake:27017".into(),
                time_millis: 3,
                collections: hashes,
            })
        }
    }

    fn collector(fake: FakeCluster, options: CollectorOptions) -> (Arc<FakeCluster>, DigestCollector) {
        let fake = Arc::new(fake);
        let collector = DigestCollector::new(fake.clone(), options, Span::none());
        (fake, collector)
    }

    #[tokio::test]
    async fn test_system_and_excluded_databases_skipped() {
        let fake = FakeCluster::default()
            .with_db("admin", &[("system.users", "x")])
            .with_db("config", &[])
            .with_db("local", &[("oplog.rs", "x")])
            .with_db("shop", &[("orders", "o")])
            .with_db("scratch", &[]);
        let options = CollectorOptions {
            exclude_databases: vec!["scratch".into()],
            ..CollectorOptions::default()
        };
        let (_, collector) = collector(fake, options);

        assert_eq!(collector.list_databases().await.unwrap(), vec!["shop"]);
    }

    #[tokio::test]
    async fn test_include_list_restricts_databases() {
        let fake = FakeCluster::default()
            .with_db("a", &[])
            .with_db("b", &[])
            .with_db("c", &[]);
        let options = CollectorOptions {
            include_databases: vec!["c".into(), "a".into()],
            ..CollectorOptions::default()
        };
        let (_, collector) = collector(fake, options);

        assert_eq!(collector.list_databases().await.unwrap(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_batched_collection_digests() {
        let fake = FakeCluster::default().with_db("shop", &[("orders", "o1"), ("users", "u1")]);
        let (fake, collector) = collector(fake, CollectorOptions::default());

        let digests = collector.collect().await.unwrap();
        let shop = &digests["shop"];
        assert_eq!(shop.digest.value(), Some("o1+u1"));
        assert_eq!(shop.digest.elapsed_ms(), Some(3));
        assert_eq!(shop.collections["orders"].value(), Some("o1"));
        assert_eq!(shop.collections["orders"].elapsed_ms(), None);
        assert_eq!(shop.collections["orders"].host(), Some("fake:27017"));
        assert_eq!(fake.calls(), vec!["shop"]);
    }

    #[tokio::test]
    async fn test_individual_collection_probes_are_isolated() {
        let fake = FakeCluster::default()
            .with_db("shop", &[("orders", "o1"), ("users", "u1")])
            .failing("shop.orders");
        let options = CollectorOptions {
            collection_probe: CollectionProbe::Individual,
            ..CollectorOptions::default()
        };
        let (fake, collector) = collector(fake, options);

        let digests = collector.collect().await.unwrap();
        let shop = &digests["shop"];
        assert!(shop.digest.is_present());
        assert_eq!(
            shop.collections["orders"].error_reason(),
            Some("not authorized")
        );
        assert_eq!(shop.collections["users"].value(), Some("u1"));
        assert_eq!(shop.collections["users"].elapsed_ms(), Some(3));
        assert_eq!(fake.calls(), vec!["shop", "shop.orders", "shop.users"]);
    }

    #[tokio::test]
    async fn test_collection_dropped_between_probes_is_errored() {
        let fake = FakeCluster::default()
            .with_db("shop", &[("carts", "c1"), ("orders", "o1")])
            .vanishing("shop.carts");
        let options = CollectorOptions {
            collection_probe: CollectionProbe::Individual,
            ..CollectorOptions::default()
        };
        let (_, collector) = collector(fake, options);

        let digests = collector.collect().await.unwrap();
        let shop = &digests["shop"];
        assert_eq!(
            shop.collections["carts"].error_reason(),
            Some("collection not returned by dbHash")
        );
        assert_eq!(shop.collections["orders"].value(), Some("o1"));
    }

    #[tokio::test]
    async fn test_failed_database_does_not_stop_collection() {
        let fake = FakeCluster::default()
            .with_db("a", &[("x", "1")])
            .with_db("b", &[("y", "2")])
            .failing("a");
        let (_, collector) = collector(fake, CollectorOptions::default());

        let digests = collector.collect().await.unwrap();
        assert_eq!(digests["a"].digest.error_reason(), Some("not authorized"));
        assert!(digests["a"].collections.is_empty());
        assert_eq!(digests["b"].digest.value(), Some("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_becomes_errored() {
        let fake = FakeCluster::default()
            .with_db("slow", &[("big", "1")])
            .with_db("quick", &[("small", "2")])
            .hanging("slow");
        let options = CollectorOptions {
            probe_timeout: Duration::from_secs(5),
            ..CollectorOptions::default()
        };
        let (_, collector) = collector(fake, options);

        let digests = collector.collect().await.unwrap();
        assert_eq!(
            digests["slow"].digest.error_reason(),
            Some("timed out after 5s")
        );
        assert!(digests["quick"].digest.is_present());
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let fake = FakeCluster {
            listing_fails: true,
            ..FakeCluster::default()
        };
        let (_, collector) = collector(fake, CollectorOptions::default());

        let err = collector.collect().await.unwrap_err();
        assert!(matches!(err, CompareError::Listing { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_empty_cluster() {
        let fake = FakeCluster::default().with_db("admin", &[]);
        let (_, collector) = collector(fake, CollectorOptions::default());

        assert!(collector.collect().await.unwrap().is_empty());
    }

    #[test]
    fn test_options_from_config() {
        let config = CompareConfig {
            probe_timeout_secs: 9,
            ..CompareConfig::default()
        };
        let options = CollectorOptions::from(&config);
        assert_eq!(options.probe_timeout, Duration::from_secs(9));
        assert_eq!(options.collection_probe, CollectionProbe::Batched);
    }
}
