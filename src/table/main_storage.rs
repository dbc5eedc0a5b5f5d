use super::aggregated::Dirty;
use super::storage::Storage;
use crate::data_types::{compare_rows, DataRow, RowValues, TableRow};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AppendsOrder {
    Empty,
    Asc,
    Desc,
    Assorted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Removes {
    None,
    AtStart,
    Anywhere,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CommitResult {
    pub dirty: Dirty,
    pub added: usize,
    pub removed: usize,
}

/// Pushes `row`, replacing the tail when it has the same key and `dedup` is on.
/// Returns true when a row was replaced.
fn push_row(rows: &mut Vec<DataRow>, row: DataRow, dedup: bool) -> bool {
    if dedup {
        if let Some(last) = rows.last_mut() {
            if last.key == row.key {
                *last = row;
                return true;
            }
        }
    }
    rows.push(row);
    false
}

/// Raw rows of a table plus the appends and removals of the open batch.
pub(crate) struct MainStorage {
    pub storage: Storage<RowValues>,
    appends: Vec<DataRow>,
    order: AppendsOrder,
    removes: Removes,
    dedup: bool,
    next_order: u64,
}

impl MainStorage {
    pub fn new(dedup: bool) -> Self {
        Self {
            storage: Storage::new(),
            appends: Vec::new(),
            order: AppendsOrder::Empty,
            removes: Removes::None,
            dedup,
            next_order: 0,
        }
    }

    pub fn pending_appends(&self) -> usize {
        self.appends.len()
    }

    pub fn push(&mut self, key: i64, values: RowValues, dedup: bool) {
        self.dedup = dedup;
        let row = TableRow::new(key, values, self.next_order);
        self.next_order += 1;

        let Some(last) = self.appends.last() else {
            self.order = AppendsOrder::Asc;
            self.appends.push(row);
            return;
        };
        let cmp = key.cmp(&last.key);
        if dedup && cmp == Ordering::Equal {
            push_row(&mut self.appends, row, true);
            return;
        }
        self.order = match (self.order, cmp) {
            (AppendsOrder::Asc, Ordering::Greater | Ordering::Equal) => AppendsOrder::Asc,
            (AppendsOrder::Asc, Ordering::Less) if self.appends.len() == 1 => AppendsOrder::Desc,
            (AppendsOrder::Desc, Ordering::Less) => AppendsOrder::Desc,
            _ => AppendsOrder::Assorted,
        };
        self.appends.push(row);
    }

    /// Puts the appends in storage order, keeping only the last row per key when deduplicating.
    fn normalize_appends(&mut self) {
        match self.order {
            AppendsOrder::Desc => self.appends.reverse(),
            AppendsOrder::Assorted => {
                self.appends.sort_by(compare_rows);
                if self.dedup {
                    let sorted = std::mem::take(&mut self.appends);
                    for row in sorted {
                        push_row(&mut self.appends, row, true);
                    }
                }
            }
            AppendsOrder::Empty | AppendsOrder::Asc => {}
        }
        if !self.appends.is_empty() {
            self.order = AppendsOrder::Asc;
        }
    }

    /// Marks rows with keys inside the inclusive range, open bounds allowed.
    pub fn remove(&mut self, start: Option<i64>, end: Option<i64>) -> usize {
        let in_range =
            |key: i64| start.map_or(true, |s| key >= s) && end.map_or(true, |e| key <= e);
        let rows = &mut self.storage.rows;
        let from = start.map_or(0, |s| rows.partition_point(|r| r.key < s));
        let to = end.map_or(rows.len(), |e| rows.partition_point(|r| r.key <= e));

        let mut marked = 0;
        if from < to {
            for row in rows[from..to].iter_mut().filter(|r| !r.is_removed) {
                row.is_removed = true;
                marked += 1;
            }
        }
        let mut marked_appends = 0;
        for row in self.appends.iter_mut().filter(|r| !r.is_removed && in_range(r.key)) {
            row.is_removed = true;
            marked_appends += 1;
        }

        if marked + marked_appends > 0 {
            let kind = if from == 0 && marked_appends == 0 {
                Removes::AtStart
            } else {
                Removes::Anywhere
            };
            self.removes = self.removes.max(kind);
        }
        marked + marked_appends
    }

    /// Marks the first `count` live rows in key order.
    pub fn remove_first(&mut self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        self.normalize_appends();

        let rows = &mut self.storage.rows;
        let (mut i, mut j) = (0, 0);
        let mut marked = 0;
        let mut touched_appends = false;
        while marked < count {
            while i < rows.len() && rows[i].is_removed {
                i += 1;
            }
            while j < self.appends.len() && self.appends[j].is_removed {
                j += 1;
            }
            let take_storage = match (rows.get(i), self.appends.get(j)) {
                (Some(a), Some(b)) => compare_rows(a, b) != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if take_storage {
                rows[i].is_removed = true;
                i += 1;
            } else {
                self.appends[j].is_removed = true;
                j += 1;
                touched_appends = true;
            }
            marked += 1;
        }

        if marked > 0 {
            let kind = if touched_appends {
                Removes::Anywhere
            } else {
                Removes::AtStart
            };
            self.removes = self.removes.max(kind);
        }
        marked
    }

    /// Applies pending appends and removals. `None` when nothing was pending.
    pub fn commit(&mut self) -> Option<CommitResult> {
        if self.appends.is_empty() && self.removes == Removes::None {
            return None;
        }
        self.normalize_appends();

        let appends = std::mem::take(&mut self.appends);
        let to_right = match (appends.first(), self.storage.rows.last()) {
            (Some(first), Some(last)) => compare_rows(first, last) == Ordering::Greater,
            _ => true,
        };

        let mut result = CommitResult::default();
        let mut pure_append = true;

        if to_right && self.removes != Removes::Anywhere {
            let rows = &mut self.storage.rows;
            if self.removes == Removes::AtStart {
                let leading = rows.iter().take_while(|r| r.is_removed).count();
                if leading > 0 {
                    rows.drain(..leading);
                    result.dirty |= Dirty::LEFT_REMOVES;
                    result.removed += leading;
                    pure_append = false;
                }
            }

            let before = rows.len();
            let mut replaced = false;
            for row in appends {
                if row.is_removed {
                    continue;
                }
                replaced |= push_row(rows, row, self.dedup);
                result.added += 1;
            }
            if result.added > 0 {
                result.dirty |= Dirty::RIGHT_APPENDS;
            }
            if replaced {
                pure_append = false;
            }

            if pure_append {
                self.storage.relink_from(before);
            } else {
                self.storage.relink();
            }
        } else {
            let old = std::mem::take(&mut self.storage.rows);
            let mut merged = Vec::with_capacity(old.len() + appends.len());
            let mut left = old.into_iter().peekable();
            let mut right = appends.into_iter().peekable();
            loop {
                let take_left = match (left.peek(), right.peek()) {
                    (Some(a), Some(b)) => compare_rows(a, b) != Ordering::Greater,
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    (None, None) => break,
                };
                let (row, from_appends) = if take_left {
                    (left.next(), false)
                } else {
                    (right.next(), true)
                };
                let Some(row) = row else { break };
                if row.is_removed {
                    if !from_appends {
                        result.removed += 1;
                    }
                    continue;
                }
                if from_appends {
                    result.added += 1;
                }
                push_row(&mut merged, row, self.dedup);
            }
            self.storage.rows = merged;
            self.storage.relink();
            result.dirty |= Dirty::TOTAL_MESS;
            pure_append = false;
        }

        if !pure_append {
            self.storage.reset_runs();
        }
        self.removes = Removes::None;
        self.order = AppendsOrder::Empty;
        Some(result)
    }

    /// Drops pending appends and clears pending removal marks.
    pub fn rollback(&mut self) {
        self.appends.clear();
        self.order = AppendsOrder::Empty;
        if self.removes != Removes::None {
            for row in self.storage.rows.iter_mut() {
                row.is_removed = false;
            }
            self.removes = Removes::None;
        }
    }
}
