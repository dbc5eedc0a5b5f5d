//! Named, read-only projections of a table's columns.

use crate::aggregation::{AggregateColumn, Reducer};
use crate::data_types::{ColumnRef, Interval, SearchMode};
use crate::table::Table;
use std::fmt;

/// What a mapping field reads.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldBinding {
    /// A raw column; in aggregated storages the registered aggregate column `aggregate`.
    Column {
        source: ColumnRef,
        reducer: Reducer,
        weights: Option<ColumnRef>,
        aggregate: usize,
    },
    /// A column written by a table computer.
    Computed(usize),
}

/// Field names bound to table columns, read at an optional aggregation interval.
///
/// With no interval the mapping reads raw rows and every column field is a
/// passthrough. With an interval it reads buckets, each field reduced with its
/// reducer over the raw rows of the bucket.
#[derive(Clone)]
pub struct TableMapping {
    table: Table,
    interval: Option<Interval>,
    fields: Vec<(String, FieldBinding)>,
}

impl fmt::Debug for TableMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableMapping")
            .field("interval", &self.interval)
            .field("fields", &self.fields)
            .finish()
    }
}

impl TableMapping {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            interval: None,
            fields: Vec::new(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn interval(&self) -> Option<Interval> {
        self.interval
    }

    pub fn with_interval(mut self, interval: Option<Interval>) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_interval(&mut self, interval: Option<Interval>) -> &mut Self {
        self.interval = interval;
        self
    }

    fn bind(&mut self, name: &str, binding: FieldBinding) -> &mut Self {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = binding,
            None => self.fields.push((name.to_string(), binding)),
        }
        self
    }

    /// Binds `name` to a raw column. Without a reducer the field keeps the
    /// last value of each bucket.
    pub fn add_field(
        &mut self,
        name: &str,
        source: impl Into<ColumnRef>,
        reducer: Option<Reducer>,
    ) -> &mut Self {
        let source = source.into();
        let reducer = reducer.unwrap_or(Reducer::Last);
        let aggregate = self
            .table
            .register_column(AggregateColumn::new(source.clone(), reducer));
        self.bind(
            name,
            FieldBinding::Column {
                source,
                reducer,
                weights: None,
                aggregate,
            },
        )
    }

    /// Binds `name` to the average of `source` weighted by `weights`.
    pub fn add_weighted_field(
        &mut self,
        name: &str,
        source: impl Into<ColumnRef>,
        weights: impl Into<ColumnRef>,
    ) -> &mut Self {
        let source = source.into();
        let weights = weights.into();
        let aggregate = self
            .table
            .register_column(AggregateColumn::weighted(source.clone(), weights.clone()));
        self.bind(
            name,
            FieldBinding::Column {
                source,
                reducer: Reducer::WeightedAverage,
                weights: Some(weights),
                aggregate,
            },
        )
    }

    pub fn add_computed_field(&mut self, name: &str, column: usize) -> &mut Self {
        self.bind(name, FieldBinding::Computed(column))
    }

    pub fn fields(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn binding(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub(crate) fn bindings(&self) -> Vec<(String, FieldBinding)> {
        self.fields.clone()
    }

    pub fn row_count(&self) -> usize {
        self.table.read_view(self.interval.as_ref(), |view| view.len())
    }

    pub fn key(&self, index: usize) -> Option<i64> {
        self.table.read_view(self.interval.as_ref(), |view| view.key(index))
    }

    /// Value of `field` in row (or bucket) `index`; NaN for unknown fields or indices.
    pub fn get(&self, index: usize, field: &str) -> f64 {
        let Some(binding) = self.binding(field) else {
            return f64::NAN;
        };
        self.table
            .read_view(self.interval.as_ref(), |view| view.read(index, binding))
    }

    pub fn search_index(&self, key: i64, mode: SearchMode) -> Option<usize> {
        self.table.search_index(key, mode, self.interval.as_ref())
    }

    /// Snapshot of every field for rows with keys inside `[start, end]`.
    pub fn iter(&self, start: Option<i64>, end: Option<i64>) -> MappingIterator {
        let names: Vec<String> = self.fields.iter().map(|(n, _)| n.clone()).collect();
        self.table.read_view(self.interval.as_ref(), |view| {
            let range = match view.len() {
                0 => 0..0,
                len => {
                    let selection = view.select(start.unwrap_or(i64::MIN), end.unwrap_or(i64::MAX));
                    match (selection.first_index, selection.last_index) {
                        (Some(first), Some(last)) => first..(last + 1).min(len),
                        _ => 0..0,
                    }
                }
            };
            let mut keys = Vec::with_capacity(range.len());
            let mut values = Vec::with_capacity(range.len() * self.fields.len());
            for index in range.clone() {
                keys.push(view.key(index).unwrap_or_default());
                values.extend(self.fields.iter().map(|(_, b)| view.read(index, b)));
            }
            MappingIterator {
                names,
                first_index: range.start,
                keys,
                values,
                cursor: None,
            }
        })
    }

    /// Smallest and largest finite value of `field` within `[start, end]`.
    pub fn min_max(&self, field: &str, start: Option<i64>, end: Option<i64>) -> Option<(f64, f64)> {
        let mut it = self.iter(start, end);
        let mut result: Option<(f64, f64)> = None;
        while it.advance() {
            let v = it.get(field);
            if !v.is_finite() {
                continue;
            }
            result = Some(match result {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        result
    }
}

/// Cursor over a snapshot of mapped rows.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingIterator {
    names: Vec<String>,
    first_index: usize,
    keys: Vec<i64>,
    values: Vec<f64>,
    cursor: Option<usize>,
}

impl MappingIterator {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Moves to the next row; false once past the last one.
    pub fn advance(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.keys.len() {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.keys.len());
            false
        }
    }

    fn current(&self) -> Option<usize> {
        self.cursor.filter(|&c| c < self.keys.len())
    }

    pub fn key(&self) -> Option<i64> {
        self.current().map(|c| self.keys[c])
    }

    /// Storage index of the current row.
    pub fn index(&self) -> Option<usize> {
        self.current().map(|c| self.first_index + c)
    }

    pub fn get(&self, field: &str) -> f64 {
        let (Some(c), Some(f)) = (self.current(), self.names.iter().position(|n| n == field)) else {
            return f64::NAN;
        };
        self.values[c * self.names.len() + f]
    }

    pub fn keys(&self) -> &[i64] {
        &self.keys
    }
}
