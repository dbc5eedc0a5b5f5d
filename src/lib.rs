//! stock_table: indexed time-series tables, aggregating mappings, indicators
//! and date-time scales for stock charts.

pub mod aggregation;
pub mod computer;
pub mod data_types;
pub mod indicators;
pub mod mapping;
#[cfg(feature = "polars")]
pub mod polars_source;
pub mod scales;
pub mod table;
pub mod utils;

pub use aggregation::Reducer;
pub use computer::{Calculation, CycledQueue, FnCalculation, RowProxy, TableComputer};
pub use data_types::{
    ColumnRef, DataRow, Interval, IntervalUnit, RowValues, SearchMode, Selection, Signal,
    TableConfig, TableRow,
};
pub use indicators::{Indicator, IndicatorKind};
pub use mapping::{MappingIterator, TableMapping};
pub use scales::{Grouping, KeyIndexRegistry, OrdinalScale, ScatterScale, Tick, TicksIterator};
pub use table::{AddOptions, AddReport, Table};
