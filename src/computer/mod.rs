//! Derived columns computed row by row over a table.

pub mod cycled_queue;

pub use cycled_queue::CycledQueue;

use crate::data_types::Interval;
use crate::mapping::TableMapping;
use crate::table::Table;
use eyre::Result;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputerId(pub(crate) u64);

impl fmt::Display for ComputerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A calculation run over every row of a storage, oldest first.
///
/// The table keeps a pristine copy and clones it whenever a storage has to be
/// computed from scratch, then calls `start` once and `step` per row. Later
/// appends only call `step` for the new rows.
pub trait Calculation: Send + Sync {
    fn start(&mut self) {}

    fn step(&mut self, row: &mut RowProxy<'_>);

    fn box_clone(&self) -> Box<dyn Calculation>;
}

impl Clone for Box<dyn Calculation> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Inputs and outputs of the row being computed.
pub struct RowProxy<'a> {
    key: i64,
    index: usize,
    input_names: &'a [String],
    inputs: &'a [f64],
    output_names: &'a [String],
    outputs: &'a mut [f64],
}

impl<'a> RowProxy<'a> {
    pub fn new(
        key: i64,
        index: usize,
        input_names: &'a [String],
        inputs: &'a [f64],
        output_names: &'a [String],
        outputs: &'a mut [f64],
    ) -> Self {
        Self {
            key,
            index,
            input_names,
            inputs,
            output_names,
            outputs,
        }
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    /// Position of the row in its storage.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Input field value by name, NaN if the mapping has no such field.
    pub fn get(&self, name: &str) -> f64 {
        self.input_names
            .iter()
            .position(|n| n == name)
            .map_or(f64::NAN, |i| self.inputs[i])
    }

    pub fn get_at(&self, index: usize) -> f64 {
        self.inputs.get(index).copied().unwrap_or(f64::NAN)
    }

    /// Writes an output by alias. Returns false for unknown aliases.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.output_names.iter().position(|n| n == name) {
            Some(i) => {
                self.outputs[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn set_at(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.outputs.get_mut(index) {
            *slot = value;
        }
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

type StartFn<C> = Arc<dyn Fn(&mut C) + Send + Sync>;
type StepFn<C> = Arc<dyn Fn(&mut RowProxy<'_>, &mut C) + Send + Sync>;

/// Calculation assembled from a context value and plain functions.
///
/// ```ignore
/// let calc = FnCalculation::new(0.0)
///     .start_function(|sum: &mut f64| *sum = 0.0)
///     .calculation_function(|row, sum| {
///         *sum += row.get("value");
///         row.set_at(0, *sum);
///     });
/// ```
#[derive(Clone)]
pub struct FnCalculation<C> {
    context: C,
    start: Option<StartFn<C>>,
    step: Option<StepFn<C>>,
}

impl<C: Clone + Send + Sync + 'static> FnCalculation<C> {
    pub fn new(context: C) -> Self {
        Self {
            context,
            start: None,
            step: None,
        }
    }

    pub fn start_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.start = Some(Arc::new(f));
        self
    }

    pub fn calculation_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RowProxy<'_>, &mut C) + Send + Sync + 'static,
    {
        self.step = Some(Arc::new(f));
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C: Clone + Send + Sync + 'static> Calculation for FnCalculation<C> {
    fn start(&mut self) {
        if let Some(start) = &self.start {
            start(&mut self.context);
        }
    }

    fn step(&mut self, row: &mut RowProxy<'_>) {
        if let Some(step) = &self.step {
            step(row, &mut self.context);
        }
    }

    fn box_clone(&self) -> Box<dyn Calculation> {
        Box::new(self.clone())
    }
}

/// Handle to a computer registered on a table.
#[derive(Clone)]
pub struct TableComputer {
    table: Table,
    id: ComputerId,
}

impl TableComputer {
    pub(crate) fn new(table: Table, id: ComputerId) -> Self {
        Self { table, id }
    }

    pub fn id(&self) -> ComputerId {
        self.id
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Installs the calculation and recomputes from the first row.
    pub fn set_calculation<C>(&self, calculation: C) -> Result<&Self>
    where
        C: Calculation + 'static,
    {
        self.set_boxed_calculation(Box::new(calculation))
    }

    pub fn set_boxed_calculation(&self, calculation: Box<dyn Calculation>) -> Result<&Self> {
        self.table.set_computer_calculation(self.id, calculation)?;
        Ok(self)
    }

    /// Declares an output column under a table-wide unique alias.
    pub fn add_output_field(&self, alias: &str) -> Result<usize> {
        self.table.add_computer_output(self.id, alias)
    }

    /// Alias and computed column of every output, in declaration order.
    pub fn output_fields(&self) -> Vec<(String, usize)> {
        self.table.computer_outputs(self.id)
    }

    /// Mapping exposing the outputs by alias.
    pub fn output_mapping(&self, interval: Option<Interval>) -> TableMapping {
        let mut mapping = self.table.mapping().with_interval(interval);
        for (alias, column) in self.output_fields() {
            mapping.add_computed_field(&alias, column);
        }
        mapping
    }

    /// Discards every computed state; the next read recomputes all rows.
    pub fn reinit(&self) -> Result<()> {
        self.table.reinit_computer(self.id)
    }

    /// Unregisters the computer and frees its columns.
    pub fn dispose(self) {
        self.table.remove_computer(self.id);
    }
}

impl fmt::Debug for TableComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableComputer").field("id", &self.id).finish()
    }
}
