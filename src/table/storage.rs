use crate::computer::{Calculation, ComputerId, RowProxy};
use crate::data_types::{ColumnValues, SearchMode, Selection, TableRow};
use crate::mapping::FieldBinding;
use eyre::Result;
use std::collections::HashMap;

/// Computer registration as seen by the storages.
pub(crate) struct ComputerEntry {
    pub id: ComputerId,
    pub input_names: Vec<String>,
    pub inputs: Vec<FieldBinding>,
    pub output_names: Vec<String>,
    pub output_columns: Vec<usize>,
    pub calculation: Option<Box<dyn Calculation>>,
    /// Bumped whenever the computer must restart from the first row.
    pub generation: u64,
}

/// Progress of one computer over one storage.
struct ComputerRun {
    generation: u64,
    rows_done: usize,
    context: Box<dyn Calculation>,
}

/// Sorted arena of rows with neighbour links and per-computer progress.
pub struct Storage<V> {
    pub(crate) rows: Vec<TableRow<V>>,
    min_distance: f64,
    runs: HashMap<ComputerId, ComputerRun>,
}

impl<V> Default for Storage<V> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            min_distance: f64::NAN,
            runs: HashMap::new(),
        }
    }
}

pub(crate) fn read_binding<V: ColumnValues>(row: &TableRow<V>, binding: &FieldBinding) -> f64 {
    match binding {
        FieldBinding::Column {
            source, aggregate, ..
        } => row.values.read(source, *aggregate),
        FieldBinding::Computed(column) => row.computed_value(*column),
    }
}

impl<V: ColumnValues> Storage<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TableRow<V>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&TableRow<V>> {
        self.rows.get(index)
    }

    pub fn first_key(&self) -> Option<i64> {
        self.rows.first().map(|r| r.key)
    }

    pub fn last_key(&self) -> Option<i64> {
        self.rows.last().map(|r| r.key)
    }

    /// Smallest gap between neighbouring keys, NaN below two rows.
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    pub fn read(&self, index: usize, binding: &FieldBinding) -> f64 {
        self.rows
            .get(index)
            .map_or(f64::NAN, |row| read_binding(row, binding))
    }

    /// Rebuilds every link and the min distance.
    pub(crate) fn relink(&mut self) {
        self.min_distance = f64::NAN;
        self.relink_from(0);
    }

    /// Relinks rows from `start` on; rows before it are assumed linked.
    pub(crate) fn relink_from(&mut self, start: usize) {
        let n = self.rows.len();
        let from = start.saturating_sub(1);
        for i in from..n {
            let prev = i.checked_sub(1);
            let next = (i + 1 < n).then_some(i + 1);
            if let Some(p) = prev {
                let gap = self.rows[i].key.abs_diff(self.rows[p].key) as f64;
                if i >= start && (self.min_distance.is_nan() || gap < self.min_distance) {
                    self.min_distance = gap;
                }
            }
            let row = &mut self.rows[i];
            row.prev = prev;
            row.next = next;
        }
    }

    pub(crate) fn replace_rows(&mut self, rows: Vec<TableRow<V>>) {
        self.rows = rows;
        self.relink();
        self.reset_runs();
    }

    /// Forces every computer to restart from the first row on next update.
    pub(crate) fn reset_runs(&mut self) {
        self.runs.clear();
    }

    pub(crate) fn drop_run(&mut self, id: ComputerId) {
        self.runs.remove(&id);
    }

    pub fn search_index(&self, key: i64, mode: SearchMode) -> Option<usize> {
        let n = self.rows.len();
        if n == 0 {
            return None;
        }
        // Equal keys resolve to the one added last.
        let hi = self.rows.partition_point(|r| r.key <= key);
        let exact = hi > 0 && self.rows[hi - 1].key == key;
        if exact {
            return Some(hi - 1);
        }
        let prev = hi.checked_sub(1);
        let next = (hi < n).then_some(hi);
        match mode {
            SearchMode::Exact => None,
            SearchMode::ExactOrPrev => prev,
            SearchMode::ExactOrNext => next,
            SearchMode::Nearest => match (prev, next) {
                (Some(p), Some(nx)) => {
                    if key.abs_diff(self.rows[p].key) <= self.rows[nx].key.abs_diff(key) {
                        Some(p)
                    } else {
                        Some(nx)
                    }
                }
                (p, nx) => p.or(nx),
            },
        }
    }

    pub fn select(&self, start: i64, end: i64) -> Selection {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let n = self.rows.len();
        let first = self.rows.partition_point(|r| r.key < start);
        let after = self.rows.partition_point(|r| r.key <= end);
        let has_rows = first < after;
        Selection {
            start_key: start,
            end_key: end,
            pre_first_index: first.checked_sub(1),
            first_index: has_rows.then_some(first),
            last_index: has_rows.then(|| after - 1),
            post_last_index: (after < n).then_some(after),
            min_distance: self.min_distance,
        }
    }

    /// Runs computers over rows they have not seen yet, in registration order.
    pub(crate) fn update_computed(&mut self, computers: &[ComputerEntry], width: usize) -> Result<()> {
        let mut missing = Vec::new();
        let len = self.rows.len();

        for entry in computers {
            let Some(prototype) = entry.calculation.as_ref() else {
                if !entry.output_columns.is_empty() {
                    missing.push(entry.id);
                }
                continue;
            };

            let run = self.runs.entry(entry.id).or_insert_with(|| ComputerRun {
                generation: entry.generation,
                rows_done: 0,
                context: prototype.box_clone(),
            });
            if run.generation != entry.generation || run.rows_done > len {
                *run = ComputerRun {
                    generation: entry.generation,
                    rows_done: 0,
                    context: prototype.box_clone(),
                };
            }
            if run.rows_done == len {
                continue;
            }
            if run.rows_done == 0 {
                run.context.start();
            }

            let mut inputs = vec![f64::NAN; entry.inputs.len()];
            let mut outputs = vec![f64::NAN; entry.output_columns.len()];
            for index in run.rows_done..len {
                let row = &mut self.rows[index];
                row.ensure_computed(width);
                for (slot, binding) in inputs.iter_mut().zip(&entry.inputs) {
                    *slot = read_binding(row, binding);
                }
                outputs.fill(f64::NAN);
                let mut proxy = RowProxy::new(
                    row.key,
                    index,
                    &entry.input_names,
                    &inputs,
                    &entry.output_names,
                    &mut outputs,
                );
                run.context.step(&mut proxy);
                for (value, &column) in outputs.iter().zip(&entry.output_columns) {
                    row.computed[column] = *value;
                }
            }
            run.rows_done = len;
        }

        if !missing.is_empty() {
            eyre::bail!("computers {:?} have output fields but no calculation function", missing);
        }
        Ok(())
    }
}
