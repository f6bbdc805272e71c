//! Single-pass roll-up of comparison records.

use super::types::{ComparisonRecord, EntityKind, KindCounts, MatchStatus, Summary};

/// Running counters over a record stream.
///
/// Holds nothing but the counters, so records can be fed one at a time as
/// they are produced.
#[derive(Debug, Default)]
pub struct Aggregator {
    summary: Summary,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record.
    pub fn observe(&mut self, record: &ComparisonRecord) {
        let counts = match record.kind() {
            EntityKind::Database => &mut self.summary.databases,
            EntityKind::Collection => &mut self.summary.collections,
        };
        tally(counts, record.status());
    }

    /// Counters so far.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn finish(self) -> Summary {
        self.summary
    }
}

fn tally(counts: &mut KindCounts, status: MatchStatus) {
    counts.total += 1;
    match status {
        MatchStatus::Match => {}
        MatchStatus::Mismatch => counts.mismatches += 1,
        MatchStatus::MissingSource | MatchStatus::MissingDest => counts.missing += 1,
        MatchStatus::Unverified => counts.unverified += 1,
    }
}

impl Summary {
    /// Aggregate a whole record sequence.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ComparisonRecord>,
    {
        let mut aggregator = Aggregator::new();
        for record in records {
            aggregator.observe(record);
        }
        aggregator.finish()
    }
}

impl Extend<ComparisonRecord> for Aggregator {
    fn extend<T: IntoIterator<Item = ComparisonRecord>>(&mut self, iter: T) {
        for record in iter {
            self.observe(&record);
        }
    }
}
