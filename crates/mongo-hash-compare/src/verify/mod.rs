//! Digest reconciliation between a source and a destination cluster.
//!
//! Verification runs in two stages over the collector output:
//!
//! - **Reconcile**: walk the sorted union of database names, emitting one
//!   database record each, and drill into collections only where the
//!   database digest is present on both sides
//! - **Aggregate**: fold the records into per-kind counters and a verdict
//!
//! Both stages are pure. Reconciling the same inputs twice yields the same
//! records in the same order.

pub mod aggregate;
pub mod types;

// Re-exports
pub use aggregate::Aggregator;
pub use types::{
    ClusterDigests, ComparisonRecord, DatabaseDigests, Digest, EntityKind, KindCounts,
    MatchStatus, Summary, Verdict,
};

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, Span};

/// Matches two collector outputs into comparison records.
pub struct Reconciler {
    span: Span,
}

impl Reconciler {
    /// Create a reconciler that logs inside `span`.
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Produce the ordered record sequence for `source` vs `dest`.
    pub fn reconcile(&self, source: &ClusterDigests, dest: &ClusterDigests) -> Vec<ComparisonRecord> {
        let _entered = self.span.enter();
        let mut records = Vec::new();

        for name in sorted_union(source, dest) {
            let src = source.get(name);
            let dst = dest.get(name);

            let src_digest = src.map_or(Digest::Absent, |d| d.digest.clone());
            let dst_digest = dst.map_or(Digest::Absent, |d| d.digest.clone());
            let drill_down = src_digest.is_present() && dst_digest.is_present();

            let record = ComparisonRecord::database(name.as_str(), src_digest, dst_digest);
            debug!("database {}: {}", name, record.status());
            records.push(record);

            if let (Some(src), Some(dst)) = (src, dst) {
                if drill_down {
                    let before = records.len();
                    reconcile_collections(name, &src.collections, &dst.collections, &mut records);
                    debug!(
                        "database {}: {} collection records",
                        name,
                        records.len() - before
                    );
                }
            }
        }

        info!("Reconciled {} records", records.len());
        records
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Span::none())
    }
}

/// Reconcile with no logging context.
pub fn reconcile(source: &ClusterDigests, dest: &ClusterDigests) -> Vec<ComparisonRecord> {
    Reconciler::default().reconcile(source, dest)
}

fn reconcile_collections(
    database: &str,
    source: &BTreeMap<String, Digest>,
    dest: &BTreeMap<String, Digest>,
    records: &mut Vec<ComparisonRecord>,
) {
    for name in sorted_union(source, dest) {
        let src = source.get(name).cloned().unwrap_or(Digest::Absent);
        let dst = dest.get(name).cloned().unwrap_or(Digest::Absent);
        records.push(ComparisonRecord::collection(database, name.as_str(), src, dst));
    }
}

/// Keys present in either map, in byte order.
fn sorted_union<'a, V>(a: &'a BTreeMap<String, V>, b: &'a BTreeMap<String, V>) -> BTreeSet<&'a String> {
    a.keys().chain(b.keys()).collect()
}
