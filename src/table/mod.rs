//! Keyed row storage with transactional updates and per-interval aggregates.

mod aggregated;
mod key_parser;
mod main_storage;
pub mod storage;

pub use storage::Storage;

use crate::aggregation::AggregateColumn;
use crate::computer::{Calculation, ComputerId, TableComputer};
use crate::data_types::{
    ColumnRef, DataRow, Interval, MappingSettings, Observers, RowValues, SearchMode, Selection, Signal,
    SubscriptionId, TableConfig,
};
use crate::mapping::{FieldBinding, TableMapping};
use aggregated::{AggregatedStorage, Dirty};
use eyre::{bail, eyre, Result, WrapErr};
use key_parser::KeyParser;
use main_storage::MainStorage;
use parking_lot::{RwLock, RwLockWriteGuard};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use storage::ComputerEntry;
use tracing::{debug, error, warn};

/// Per-call ingestion options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Overrides the table's duplicate policy for this batch.
    pub remove_duplicates: Option<bool>,
    /// Removes this many leading rows after inserting, for sliding windows.
    pub remove_from_start: usize,
}

impl AddOptions {
    pub fn with_remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    pub fn with_remove_from_start(mut self, count: usize) -> Self {
        self.remove_from_start = count;
        self
    }
}

/// Outcome of one `add_data` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Rows queued for insertion.
    pub added: usize,
    /// Rows whose key could not be normalized.
    pub dropped: usize,
}

/// Borrowed storage a mapping reads from.
pub(crate) enum StorageView<'a> {
    Main(&'a Storage<RowValues>),
    Aggregated(&'a Storage<Vec<f64>>),
    Empty,
}

impl StorageView<'_> {
    pub fn len(&self) -> usize {
        match self {
            StorageView::Main(s) => s.len(),
            StorageView::Aggregated(s) => s.len(),
            StorageView::Empty => 0,
        }
    }

    pub fn key(&self, index: usize) -> Option<i64> {
        match self {
            StorageView::Main(s) => s.row(index).map(|r| r.key),
            StorageView::Aggregated(s) => s.row(index).map(|r| r.key),
            StorageView::Empty => None,
        }
    }

    pub fn keys(&self) -> Vec<i64> {
        match self {
            StorageView::Main(s) => s.rows().iter().map(|r| r.key).collect(),
            StorageView::Aggregated(s) => s.rows().iter().map(|r| r.key).collect(),
            StorageView::Empty => Vec::new(),
        }
    }

    pub fn read(&self, index: usize, binding: &FieldBinding) -> f64 {
        match self {
            StorageView::Main(s) => s.read(index, binding),
            StorageView::Aggregated(s) => s.read(index, binding),
            StorageView::Empty => f64::NAN,
        }
    }

    pub fn search_index(&self, key: i64, mode: SearchMode) -> Option<usize> {
        match self {
            StorageView::Main(s) => s.search_index(key, mode),
            StorageView::Aggregated(s) => s.search_index(key, mode),
            StorageView::Empty => None,
        }
    }

    pub fn select(&self, start: i64, end: i64) -> Selection {
        match self {
            StorageView::Main(s) => s.select(start, end),
            StorageView::Aggregated(s) => s.select(start, end),
            StorageView::Empty => Selection::empty(start.min(end), start.max(end)),
        }
    }
}

pub(crate) struct TableState {
    main: MainStorage,
    aggregates: HashMap<Interval, AggregatedStorage>,
    columns: Vec<AggregateColumn>,
    computed_aliases: HashMap<String, usize>,
    computed_width: usize,
    free_computed: BTreeSet<usize>,
    computers: Vec<ComputerEntry>,
    next_computer_id: u64,
    key_parser: KeyParser,
    remove_duplicates: bool,
    in_transaction: bool,
    dropped_rows: u64,
}

impl TableState {
    fn new(config: &TableConfig) -> Self {
        Self {
            main: MainStorage::new(config.remove_duplicates),
            aggregates: HashMap::new(),
            columns: Vec::new(),
            computed_aliases: HashMap::new(),
            computed_width: 0,
            free_computed: BTreeSet::new(),
            computers: Vec::new(),
            next_computer_id: 0,
            key_parser: KeyParser::new(config),
            remove_duplicates: config.remove_duplicates,
            in_transaction: false,
            dropped_rows: 0,
        }
    }

    fn push_rows<I, R>(&mut self, rows: I, options: &AddOptions) -> AddReport
    where
        I: IntoIterator<Item = R>,
        R: Into<RowValues>,
    {
        let dedup = options.remove_duplicates.unwrap_or(self.remove_duplicates);
        let mut report = AddReport::default();
        for (position, row) in rows.into_iter().enumerate() {
            let values: RowValues = row.into();
            match self.key_parser.key_of(&values) {
                Some(key) => {
                    self.main.push(key, values, dedup);
                    report.added += 1;
                }
                None => {
                    warn!(position, "dropping row: key column could not be normalized");
                    report.dropped += 1;
                }
            }
        }
        self.dropped_rows += report.dropped as u64;
        if options.remove_from_start > 0 {
            self.main.remove_first(options.remove_from_start);
        }
        report
    }

    /// Returns whether stored data changed.
    fn commit(&mut self) -> bool {
        let Some(result) = self.main.commit() else {
            return false;
        };
        if result.dirty.is_empty() {
            return false;
        }
        debug!(
            added = result.added,
            removed = result.removed,
            rows = self.main.storage.len(),
            "table commit"
        );
        for aggregate in self.aggregates.values_mut() {
            aggregate.mark(result.dirty);
        }
        true
    }

    fn register_column(&mut self, column: AggregateColumn) -> usize {
        if let Some(index) = self.columns.iter().position(|c| *c == column) {
            return index;
        }
        self.columns.push(column);
        for aggregate in self.aggregates.values_mut() {
            aggregate.mark(Dirty::COLUMNS_COUNT);
        }
        self.columns.len() - 1
    }

    fn computer_mut(&mut self, id: ComputerId) -> Result<&mut ComputerEntry> {
        self.computers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| eyre!("computer {} is not registered on this table", id))
    }

    /// Brings aggregates and computed columns of one storage up to date.
    fn ensure_current(&mut self, interval: Option<&Interval>) -> Result<()> {
        match interval {
            None => self
                .main
                .storage
                .update_computed(&self.computers, self.computed_width),
            Some(interval) => {
                let aggregate = self
                    .aggregates
                    .entry(*interval)
                    .or_insert_with(|| AggregatedStorage::new(*interval));
                aggregate.update(self.main.storage.rows(), &self.columns);
                aggregate
                    .storage
                    .update_computed(&self.computers, self.computed_width)
            }
        }
    }

    fn view(&self, interval: Option<&Interval>) -> StorageView<'_> {
        match interval {
            None => StorageView::Main(&self.main.storage),
            Some(interval) => self
                .aggregates
                .get(interval)
                .map_or(StorageView::Empty, |a| StorageView::Aggregated(&a.storage)),
        }
    }

    fn drop_runs(&mut self, id: ComputerId) {
        self.main.storage.drop_run(id);
        for aggregate in self.aggregates.values_mut() {
            aggregate.storage.drop_run(id);
        }
    }
}

/// Shared handle to an in-memory time-series table.
///
/// Cloning is cheap; clones see the same rows. Reads bring aggregates and
/// computed columns up to date lazily. Observers get `Signal::DATA_CHANGED`
/// once per commit that changed stored rows.
#[derive(Clone)]
pub struct Table {
    state: Arc<RwLock<TableState>>,
    observers: Observers,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("len", &self.len()).finish()
    }
}

impl Table {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(TableState::new(&config))),
            observers: Observers::new(),
        }
    }

    /// True when both handles point to the same table.
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn notify(&self, changed: bool) {
        if changed {
            self.observers.dispatch(Signal::DATA_CHANGED);
        }
    }

    pub fn start_transaction(&self) -> &Self {
        let mut state = self.state.write();
        if state.in_transaction {
            debug!("transaction already open");
        }
        state.in_transaction = true;
        self
    }

    pub fn in_transaction(&self) -> bool {
        self.state.read().in_transaction
    }

    pub fn commit(&self) -> &Self {
        let changed = {
            let mut state = self.state.write();
            state.in_transaction = false;
            state.commit()
        };
        self.notify(changed);
        self
    }

    /// Discards everything queued since the transaction started.
    pub fn rollback(&self) -> &Self {
        let mut state = self.state.write();
        state.in_transaction = false;
        state.main.rollback();
        self
    }

    /// Runs `f` inside a transaction if none is open, committing when it returns.
    fn mutate<R>(&self, f: impl FnOnce(&mut TableState) -> R) -> R {
        let (result, changed) = {
            let mut state = self.state.write();
            let result = f(&mut state);
            let changed = if state.in_transaction {
                false
            } else {
                state.commit()
            };
            (result, changed)
        };
        self.notify(changed);
        result
    }

    pub fn add_data<I, R>(&self, rows: I) -> AddReport
    where
        I: IntoIterator<Item = R>,
        R: Into<RowValues>,
    {
        self.add_data_with(rows, AddOptions::default())
    }

    pub fn add_data_with<I, R>(&self, rows: I, options: AddOptions) -> AddReport
    where
        I: IntoIterator<Item = R>,
        R: Into<RowValues>,
    {
        self.mutate(|state| state.push_rows(rows, &options))
    }

    /// Ingests a JSON array whose items are row arrays or row objects.
    pub fn add_json(&self, json: &str) -> Result<AddReport> {
        let value: Value = serde_json::from_str(json).wrap_err("invalid JSON rows")?;
        let Value::Array(items) = value else {
            bail!("expected a JSON array of rows");
        };
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Array(values) => rows.push(RowValues::Array(values)),
                Value::Object(map) => rows.push(RowValues::Object(map)),
                other => bail!("row must be an array or an object, got {}", other),
            }
        }
        Ok(self.add_data(rows))
    }

    /// Removes rows with keys in `[start, end]`; `None` leaves a side open.
    pub fn remove(&self, start: Option<i64>, end: Option<i64>) -> usize {
        self.mutate(|state| state.main.remove(start, end))
    }

    pub fn remove_first(&self, count: usize) -> usize {
        self.mutate(|state| state.main.remove_first(count))
    }

    /// Committed row count.
    pub fn len(&self) -> usize {
        self.state.read().main.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows appended in the open transaction and not yet committed.
    pub fn pending_rows(&self) -> usize {
        self.state.read().main.pending_appends()
    }

    /// Rows dropped so far because their key could not be normalized.
    pub fn dropped_rows(&self) -> u64 {
        self.state.read().dropped_rows
    }

    pub fn keys(&self) -> Vec<i64> {
        self.read_view(None, |view| view.keys())
    }

    /// Keys of the aggregated storage for `interval`.
    pub fn keys_at(&self, interval: Option<&Interval>) -> Vec<i64> {
        self.read_view(interval, |view| view.keys())
    }

    /// Snapshot of the committed rows with computed columns up to date.
    pub fn rows(&self) -> Vec<DataRow> {
        self.with_rows(|rows| rows.to_vec())
    }

    pub fn with_rows<R>(&self, f: impl FnOnce(&[DataRow]) -> R) -> R {
        self.read_main(|storage| f(storage.rows()))
    }

    fn read_main<R>(&self, f: impl FnOnce(&Storage<RowValues>) -> R) -> R {
        let mut state = self.state.write();
        if let Err(err) = state.ensure_current(None) {
            error!(%err, "failed to update computed columns");
        }
        let state = RwLockWriteGuard::downgrade(state);
        f(&state.main.storage)
    }

    /// Row found by `mode` around `key` in the raw rows.
    pub fn search(&self, key: i64, mode: SearchMode) -> Option<DataRow> {
        self.read_main(|storage| {
            storage
                .search_index(key, mode)
                .and_then(|i| storage.row(i).cloned())
        })
    }

    pub fn search_index(&self, key: i64, mode: SearchMode, interval: Option<&Interval>) -> Option<usize> {
        self.read_view(interval, |view| view.search_index(key, mode))
    }

    pub fn select(&self, start: i64, end: i64, interval: Option<&Interval>) -> Selection {
        self.read_view(interval, |view| view.select(start, end))
    }

    /// Brings the storage for `interval` up to date, reporting computer failures.
    pub fn update(&self, interval: Option<&Interval>) -> Result<()> {
        self.state.write().ensure_current(interval)
    }

    pub(crate) fn read_view<R>(&self, interval: Option<&Interval>, f: impl FnOnce(StorageView<'_>) -> R) -> R {
        let mut state = self.state.write();
        if let Err(err) = state.ensure_current(interval) {
            error!(%err, "failed to update computed columns");
        }
        let state = RwLockWriteGuard::downgrade(state);
        f(state.view(interval))
    }

    /// Column rows are keyed by.
    pub fn key_column(&self) -> ColumnRef {
        self.state.read().key_parser.column().clone()
    }

    /// Empty mapping over this table.
    pub fn mapping(&self) -> TableMapping {
        TableMapping::new(self.clone())
    }

    /// Mapping built from declarative settings.
    pub fn map_as(&self, settings: &MappingSettings) -> TableMapping {
        let mut mapping = self.mapping();
        for (name, field) in settings {
            match (field.reducer(), field.weights()) {
                (Some(crate::aggregation::Reducer::WeightedAverage), Some(weights)) => {
                    mapping.add_weighted_field(name, field.column().clone(), weights.clone())
                }
                (reducer, _) => mapping.add_field(name, field.column().clone(), reducer),
            };
        }
        mapping
    }

    pub(crate) fn register_column(&self, column: AggregateColumn) -> usize {
        self.state.write().register_column(column)
    }

    /// Registers a computer reading the fields of `mapping`.
    pub fn create_computer(&self, mapping: &TableMapping) -> Result<TableComputer> {
        if !mapping.table().ptr_eq(self) {
            bail!("mapping belongs to another table");
        }
        let (input_names, inputs) = mapping.bindings().into_iter().unzip();
        let mut state = self.state.write();
        let id = ComputerId(state.next_computer_id);
        state.next_computer_id += 1;
        state.computers.push(ComputerEntry {
            id,
            input_names,
            inputs,
            output_names: Vec::new(),
            output_columns: Vec::new(),
            calculation: None,
            generation: 0,
        });
        Ok(TableComputer::new(self.clone(), id))
    }

    pub(crate) fn set_computer_calculation(&self, id: ComputerId, calculation: Box<dyn Calculation>) -> Result<()> {
        {
            let mut state = self.state.write();
            let entry = state.computer_mut(id)?;
            entry.calculation = Some(calculation);
            entry.generation += 1;
        }
        self.notify(true);
        Ok(())
    }

    pub(crate) fn add_computer_output(&self, id: ComputerId, alias: &str) -> Result<usize> {
        let mut state = self.state.write();
        state.computer_mut(id)?;
        if state.computed_aliases.contains_key(alias) {
            bail!("computed field alias '{}' is already taken", alias);
        }
        let column = match state.free_computed.pop_first() {
            Some(column) => column,
            None => {
                state.computed_width += 1;
                state.computed_width - 1
            }
        };
        state.computed_aliases.insert(alias.to_string(), column);
        let entry = state.computer_mut(id)?;
        entry.output_names.push(alias.to_string());
        entry.output_columns.push(column);
        entry.generation += 1;
        Ok(column)
    }

    pub(crate) fn computer_outputs(&self, id: ComputerId) -> Vec<(String, usize)> {
        let state = self.state.read();
        state
            .computers
            .iter()
            .find(|c| c.id == id)
            .map(|c| {
                c.output_names
                    .iter()
                    .cloned()
                    .zip(c.output_columns.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Computed column registered under `alias`.
    pub fn computed_column(&self, alias: &str) -> Option<usize> {
        self.state.read().computed_aliases.get(alias).copied()
    }

    pub(crate) fn reinit_computer(&self, id: ComputerId) -> Result<()> {
        {
            let mut state = self.state.write();
            state.computer_mut(id)?.generation += 1;
            state.drop_runs(id);
        }
        self.notify(true);
        Ok(())
    }

    pub(crate) fn remove_computer(&self, id: ComputerId) {
        let mut state = self.state.write();
        let Some(position) = state.computers.iter().position(|c| c.id == id) else {
            return;
        };
        let entry = state.computers.remove(position);
        for (alias, column) in entry.output_names.iter().zip(entry.output_columns) {
            state.computed_aliases.remove(alias);
            state.free_computed.insert(column);
        }
        state.drop_runs(id);
    }
}
