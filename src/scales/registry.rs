use super::key_span;
use crate::data_types::Interval;
use crate::table::Table;

/// Bijection between the union of table keys and dense indices.
///
/// Keys between registered ones map to fractional indices; keys outside the
/// range extrapolate using the nearest gap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyIndexRegistry {
    keys: Vec<i64>,
}

impl KeyIndexRegistry {
    pub fn from_keys(mut keys: Vec<i64>) -> Self {
        keys.sort_unstable();
        keys.dedup();
        Self { keys }
    }

    /// Union of the keys of every table at `interval`.
    pub fn from_tables(tables: &[&Table], interval: Option<&Interval>) -> Self {
        let keys = tables
            .iter()
            .flat_map(|table| table.keys_at(interval))
            .collect();
        Self::from_keys(keys)
    }

    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index_by_key(&self, key: i64) -> f64 {
        let keys = &self.keys;
        let n = keys.len();
        match n {
            0 => return f64::NAN,
            1 => return key_span(keys[0], key),
            _ => {}
        }
        let hi = keys.partition_point(|&k| k < key);
        if hi < n && keys[hi] == key {
            return hi as f64;
        }
        let (lo, hi) = if hi == 0 {
            (0, 1)
        } else if hi == n {
            (n - 2, n - 1)
        } else {
            (hi - 1, hi)
        };
        lo as f64 + key_span(keys[lo], key) / key_span(keys[lo], keys[hi])
    }

    pub fn key_by_index(&self, index: f64) -> Option<i64> {
        let keys = &self.keys;
        let n = keys.len();
        if n == 0 || index.is_nan() {
            return None;
        }
        if n == 1 {
            return Some(keys[0].saturating_add(index.round() as i64));
        }
        let lo = if index < 0.0 {
            0
        } else {
            (index.floor() as usize).min(n - 2)
        };
        let frac = index - lo as f64;
        if frac == 0.0 {
            return Some(keys[lo]);
        }
        let gap = key_span(keys[lo], keys[lo + 1]);
        Some(keys[lo].saturating_add((frac * gap).round() as i64))
    }

    /// Nearest registered key. Aligning a registered key returns it.
    pub fn align_key(&self, key: i64) -> Option<i64> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self
            .index_by_key(key)
            .round()
            .clamp(0.0, (self.keys.len() - 1) as f64);
        self.keys.get(index as usize).copied()
    }
}
