use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Address of a raw column: position in an array row or name in an object row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl Default for ColumnRef {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Raw values of an ingested row, kept as they came in.
#[derive(Clone, Debug, PartialEq)]
pub enum RowValues {
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl RowValues {
    pub fn get(&self, column: &ColumnRef) -> Option<&Value> {
        match (self, column) {
            (RowValues::Array(values), ColumnRef::Index(i)) => values.get(*i),
            (RowValues::Array(values), ColumnRef::Name(name)) => {
                name.parse::<usize>().ok().and_then(|i| values.get(i))
            }
            (RowValues::Object(map), ColumnRef::Name(name)) => map.get(name),
            (RowValues::Object(map), ColumnRef::Index(i)) => map.get(&i.to_string()),
        }
    }

    /// Numeric value of a column, NaN when absent or not a number.
    pub fn number(&self, column: &ColumnRef) -> f64 {
        self.get(column).map_or(f64::NAN, to_number)
    }

    pub fn len(&self) -> usize {
        match self {
            RowValues::Array(values) => values.len(),
            RowValues::Object(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for RowValues {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}

impl From<Vec<f64>> for RowValues {
    fn from(values: Vec<f64>) -> Self {
        Self::Array(values.into_iter().map(Value::from).collect())
    }
}

impl From<Map<String, Value>> for RowValues {
    fn from(map: Map<String, Value>) -> Self {
        Self::Object(map)
    }
}

/// Coerces a JSON value to a number the way chart inputs expect.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Read access to the values stored in a row.
///
/// Raw rows resolve `source`, aggregated rows resolve the registered
/// aggregate column index.
pub trait ColumnValues: Clone + Send + Sync {
    fn read(&self, source: &ColumnRef, aggregate: usize) -> f64;
}

impl ColumnValues for RowValues {
    fn read(&self, source: &ColumnRef, _aggregate: usize) -> f64 {
        self.number(source)
    }
}

impl ColumnValues for Vec<f64> {
    fn read(&self, _source: &ColumnRef, aggregate: usize) -> f64 {
        self.get(aggregate).copied().unwrap_or(f64::NAN)
    }
}

/// A keyed record living in a storage arena.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRow<V> {
    /// Epoch milliseconds.
    pub key: i64,
    pub values: V,
    /// Outputs of table computers, NaN until computed.
    pub computed: Vec<f64>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    /// Tiebreak for equal keys; larger means added later.
    pub adding_order: u64,
    pub is_removed: bool,
}

/// Row of the main storage.
pub type DataRow = TableRow<RowValues>;

/// Row of an aggregated storage: one value per registered aggregate column.
pub type AggregatedRow = TableRow<Vec<f64>>;

impl<V> TableRow<V> {
    pub fn new(key: i64, values: V, adding_order: u64) -> Self {
        Self {
            key,
            values,
            computed: Vec::new(),
            prev: None,
            next: None,
            adding_order,
            is_removed: false,
        }
    }

    pub fn computed_value(&self, column: usize) -> f64 {
        self.computed.get(column).copied().unwrap_or(f64::NAN)
    }

    pub(crate) fn ensure_computed(&mut self, width: usize) {
        if self.computed.len() < width {
            self.computed.resize(width, f64::NAN);
        }
    }
}

/// Storage order: key first, then adding order.
pub fn compare_rows<V>(a: &TableRow<V>, b: &TableRow<V>) -> Ordering {
    a.key
        .cmp(&b.key)
        .then(a.adding_order.cmp(&b.adding_order))
}
