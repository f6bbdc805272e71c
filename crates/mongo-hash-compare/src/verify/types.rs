//! Type definitions for digest reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of probing one entity on one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Digest {
    /// The server returned a digest.
    Present {
        /// Opaque digest value (dbHash md5).
        value: String,
        /// Server-reported time for the probe, when it was probed on its own.
        elapsed_ms: Option<u64>,
        /// Host that answered the probe.
        host: Option<String>,
    },
    /// The entity does not exist on this cluster.
    Absent,
    /// The entity exists but its probe failed or timed out.
    Errored {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl Digest {
    /// Create a present digest.
    pub fn present(value: impl Into<String>, elapsed_ms: Option<u64>, host: Option<String>) -> Self {
        Digest::Present {
            value: value.into(),
            elapsed_ms,
            host,
        }
    }

    /// Create an errored digest.
    pub fn errored(reason: impl Into<String>) -> Self {
        Digest::Errored {
            reason: reason.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Digest::Present { .. })
    }

    /// Digest value, if present.
    pub fn value(&self) -> Option<&str> {
        match self {
            Digest::Present { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Host that produced the digest, if present.
    pub fn host(&self) -> Option<&str> {
        match self {
            Digest::Present { host, .. } => host.as_deref(),
            _ => None,
        }
    }

    /// Elapsed milliseconds reported for the probe, if present.
    pub fn elapsed_ms(&self) -> Option<u64> {
        match self {
            Digest::Present { elapsed_ms, .. } => *elapsed_ms,
            _ => None,
        }
    }

    /// Failure reason, if errored.
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Digest::Errored { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Granularity of a compared entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Database,
    Collection,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Database => write!(f, "Database"),
            EntityKind::Collection => write!(f, "Collection"),
        }
    }
}

/// Classification of one source/destination pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Both present, equal digests.
    Match,
    /// Both present, different digests.
    Mismatch,
    /// Only the destination produced a digest.
    MissingSource,
    /// Only the source produced a digest.
    MissingDest,
    /// Neither side produced a digest (at least one side errored).
    Unverified,
}

impl MatchStatus {
    /// Classify a pairing. Total over all digest combinations.
    pub fn classify(source: &Digest, dest: &Digest) -> Self {
        match (source.value(), dest.value()) {
            (Some(s), Some(d)) if s == d => MatchStatus::Match,
            (Some(_), Some(_)) => MatchStatus::Mismatch,
            (None, Some(_)) => MatchStatus::MissingSource,
            (Some(_), None) => MatchStatus::MissingDest,
            (None, None) => MatchStatus::Unverified,
        }
    }

    /// True for either missing direction.
    pub fn is_missing(&self) -> bool {
        matches!(self, MatchStatus::MissingSource | MatchStatus::MissingDest)
    }

    /// Status seen from the other side.
    pub fn swapped(self) -> Self {
        match self {
            MatchStatus::MissingSource => MatchStatus::MissingDest,
            MatchStatus::MissingDest => MatchStatus::MissingSource,
            other => other,
        }
    }

    /// Label used in rendered reports.
    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Match => "MATCH",
            MatchStatus::Mismatch => "MISMATCH",
            MatchStatus::MissingSource => "MISSING IN SOURCE",
            MatchStatus::MissingDest => "MISSING IN DESTINATION",
            MatchStatus::Unverified => "UNVERIFIED",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One compared entity. Fields are private so `status` always agrees with the digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRecord {
    kind: EntityKind,
    database: String,
    collection: Option<String>,
    source: Digest,
    dest: Digest,
    status: MatchStatus,
}

impl ComparisonRecord {
    /// Database-level record.
    pub fn database(database: impl Into<String>, source: Digest, dest: Digest) -> Self {
        let status = MatchStatus::classify(&source, &dest);
        Self {
            kind: EntityKind::Database,
            database: database.into(),
            collection: None,
            source,
            dest,
            status,
        }
    }

    /// Collection-level record.
    pub fn collection(
        database: impl Into<String>,
        collection: impl Into<String>,
        source: Digest,
        dest: Digest,
    ) -> Self {
        let status = MatchStatus::classify(&source, &dest);
        Self {
            kind: EntityKind::Collection,
            database: database.into(),
            collection: Some(collection.into()),
            source,
            dest,
            status,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn source(&self) -> &Digest {
        &self.source
    }

    pub fn dest(&self) -> &Digest {
        &self.dest
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// `db` or `db.collection`.
    pub fn entity_name(&self) -> String {
        match &self.collection {
            Some(coll) => format!("{}.{}", self.database, coll),
            None => self.database.clone(),
        }
    }
}

/// Everything collected for one database on one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDigests {
    /// Database-level digest.
    pub digest: Digest,
    /// Per-collection digests. Empty when the database probe failed.
    pub collections: BTreeMap<String, Digest>,
}

impl DatabaseDigests {
    pub fn new(digest: Digest) -> Self {
        Self {
            digest,
            collections: BTreeMap::new(),
        }
    }

    /// Add a collection digest.
    pub fn with_collection(mut self, name: impl Into<String>, digest: Digest) -> Self {
        self.collections.insert(name.into(), digest);
        self
    }
}

/// Collector output for one cluster, keyed by database name.
pub type ClusterDigests = BTreeMap<String, DatabaseDigests>;

/// Counters for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    /// Entities compared.
    pub total: usize,
    /// Both present, digests differ.
    pub mismatches: usize,
    /// Present on exactly one side.
    pub missing: usize,
    /// Present on neither side.
    pub unverified: usize,
}

impl KindCounts {
    /// Whether this kind has nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0 && self.missing == 0 && self.unverified == 0
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Rolled-up counters for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub databases: KindCounts,
    pub collections: KindCounts,
}

impl Summary {
    /// Pass iff both kinds are clean.
    pub fn verdict(&self) -> Verdict {
        if self.databases.is_clean() && self.collections.is_clean() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Counters for one kind.
    pub fn counts(&self, kind: EntityKind) -> &KindCounts {
        match kind {
            EntityKind::Database => &self.databases,
            EntityKind::Collection => &self.collections,
        }
    }
}
