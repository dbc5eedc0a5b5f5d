use super::storage::Storage;
use crate::aggregation::{aggregate_rows, AggregateColumn};
use crate::data_types::{DataRow, Interval};
use crate::utils::IntervalGenerator;
use tracing::debug;

/// What changed in the main storage since an aggregated storage was last built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Dirty(u8);

impl Dirty {
    pub const RIGHT_APPENDS: Dirty = Dirty(1);
    pub const LEFT_REMOVES: Dirty = Dirty(2);
    pub const COLUMNS_COUNT: Dirty = Dirty(4);
    pub const TOTAL_MESS: Dirty = Dirty(8);

    pub fn contains(self, flag: Dirty) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOrAssign for Dirty {
    fn bitor_assign(&mut self, rhs: Dirty) {
        self.0 |= rhs.0;
    }
}

/// Bucketed view of the main storage for one interval.
pub(crate) struct AggregatedStorage {
    interval: Interval,
    pub storage: Storage<Vec<f64>>,
    dirty: Dirty,
    columns_built: usize,
}

impl AggregatedStorage {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            storage: Storage::new(),
            dirty: Dirty::TOTAL_MESS,
            columns_built: 0,
        }
    }

    pub fn mark(&mut self, dirty: Dirty) {
        self.dirty |= dirty;
    }

    /// Brings buckets in line with `main`. Returns whether anything was rebuilt.
    pub fn update(&mut self, main: &[DataRow], columns: &[AggregateColumn]) -> bool {
        if columns.len() != self.columns_built {
            self.dirty |= Dirty::COLUMNS_COUNT;
        }
        if self.dirty.is_empty() {
            return false;
        }

        let full = self.dirty.contains(Dirty::TOTAL_MESS)
            || self.dirty.contains(Dirty::COLUMNS_COUNT)
            || main.is_empty()
            || self.storage.is_empty();

        let rows = if full {
            debug!(interval = %self.interval, rows = main.len(), "rebuilding aggregated storage");
            aggregate_rows(main, &self.interval, columns)
        } else {
            let mut rows = std::mem::take(&mut self.storage.rows);

            if self.dirty.contains(Dirty::LEFT_REMOVES) {
                // Buckets up to and including the one holding the new first row are stale.
                let first_key = main[0].key;
                let first_bucket = IntervalGenerator::new(self.interval)
                    .align(first_key)
                    .unwrap_or(first_key);
                let stale = rows.partition_point(|r| r.key <= first_bucket);
                rows.drain(..stale);
                let boundary = rows.first().map_or(i64::MAX, |r| r.key);
                let end = main.partition_point(|r| r.key < boundary);
                let mut head = aggregate_rows(&main[..end], &self.interval, columns);
                head.append(&mut rows);
                rows = head;
            }

            if self.dirty.contains(Dirty::RIGHT_APPENDS) {
                // The last bucket may have received rows.
                if let Some(last) = rows.pop() {
                    let start = main.partition_point(|r| r.key < last.key);
                    rows.extend(aggregate_rows(&main[start..], &self.interval, columns));
                } else {
                    rows = aggregate_rows(main, &self.interval, columns);
                }
            }
            rows
        };

        self.storage.replace_rows(rows);
        self.dirty = Dirty::default();
        self.columns_built = columns.len();
        true
    }
}
