//! Per-year match counts read from the `date` fast field

use crate::models::fields;
use chrono::Datelike;
use std::collections::BTreeMap;
use tantivy::collector::{Collector, SegmentCollector};
use tantivy::columnar::Column;
use tantivy::{DateTime, DocId, Score, SegmentOrdinal, SegmentReader};

/// Calendar year to number of matching documents
pub type YearCounts = BTreeMap<i32, u64>;

/// Counts matches per calendar year without loading stored documents
pub struct YearCountCollector;

impl Collector for YearCountCollector {
    type Fruit = YearCounts;
    type Child = YearCountSegmentCollector;

    fn for_segment(
        &self,
        _segment_local_id: SegmentOrdinal,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let dates = segment.fast_fields().date(fields::DATE)?;
        Ok(YearCountSegmentCollector {
            dates,
            counts: YearCounts::new(),
        })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(&self, segment_counts: Vec<YearCounts>) -> tantivy::Result<YearCounts> {
        let mut merged = YearCounts::new();
        for counts in segment_counts {
            for (year, count) in counts {
                *merged.entry(year).or_insert(0) += count;
            }
        }
        Ok(merged)
    }
}

pub struct YearCountSegmentCollector {
    dates: Column<DateTime>,
    counts: YearCounts,
}

impl SegmentCollector for YearCountSegmentCollector {
    type Fruit = YearCounts;

    fn collect(&mut self, doc: DocId, _score: Score) {
        if let Some(year) = self.dates.first(doc).and_then(year_of) {
            *self.counts.entry(year).or_insert(0) += 1;
        }
    }

    fn harvest(self) -> YearCounts {
        self.counts
    }
}

fn year_of(date: DateTime) -> Option<i32> {
    chrono::DateTime::from_timestamp(date.into_timestamp_secs(), 0).map(|utc| utc.year())
}
