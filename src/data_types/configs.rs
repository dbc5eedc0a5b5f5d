use super::interval::{Interval, IntervalDescriptor, IntervalUnit};
use super::row::ColumnRef;
use crate::aggregation::Reducer;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ingestion settings of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    /// Column holding the row timestamp.
    pub key_column: ColumnRef,
    /// chrono format string for textual keys, e.g. `%Y-%m-%d %H:%M`.
    pub date_time_pattern: Option<String>,
    /// Shift applied to every normalized key.
    pub time_offset_hours: f64,
    /// Zone textual keys without an offset are read in. UTC when unset.
    pub timezone: Option<chrono_tz::Tz>,
    /// A later row with the same key replaces the earlier one.
    pub remove_duplicates: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            key_column: ColumnRef::Index(0),
            date_time_pattern: None,
            time_offset_hours: 0.0,
            timezone: None,
            remove_duplicates: true,
        }
    }
}

impl TableConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid table config")
    }

    pub fn with_key_column(mut self, column: impl Into<ColumnRef>) -> Self {
        self.key_column = column.into();
        self
    }

    pub fn with_date_time_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.date_time_pattern = Some(pattern.into());
        self
    }

    pub fn with_timezone(mut self, tz: chrono_tz::Tz) -> Self {
        self.timezone = Some(tz);
        self
    }

    pub fn with_time_offset_hours(mut self, hours: f64) -> Self {
        self.time_offset_hours = hours;
        self
    }

    pub fn with_remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = remove;
        self
    }
}

/// Data grouping settings of a stock scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupingConfig {
    pub enabled: bool,
    pub forced: bool,
    pub levels: Vec<IntervalDescriptor>,
    pub max_visible_points: f64,
    pub min_pix_per_point: Option<f64>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            forced: false,
            levels: default_grouping_levels(),
            max_visible_points: 500.0,
            min_pix_per_point: None,
        }
    }
}

impl GroupingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid grouping config")
    }
}

/// Minor and major tick intervals used together on an axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickLevel {
    pub minor: IntervalDescriptor,
    pub major: IntervalDescriptor,
}

impl TickLevel {
    pub fn new(minor: Interval, major: Interval) -> Self {
        Self {
            minor: minor.into(),
            major: major.into(),
        }
    }
}

/// Tick settings of a date-time scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleConfig {
    pub ticks_count: usize,
    pub levels: Vec<TickLevel>,
    pub grouping: GroupingConfig,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            ticks_count: 6,
            levels: default_tick_levels(),
            grouping: GroupingConfig::default(),
        }
    }
}

impl ScaleConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("invalid scale config")
    }
}

/// Field binding as written in a mapping declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSettings {
    Column(ColumnRef),
    Detailed {
        column: ColumnRef,
        #[serde(default, rename = "type")]
        reducer: Option<String>,
        #[serde(default)]
        weights: Option<ColumnRef>,
    },
}

impl FieldSettings {
    pub fn column(&self) -> &ColumnRef {
        match self {
            FieldSettings::Column(column) => column,
            FieldSettings::Detailed { column, .. } => column,
        }
    }

    /// Reducer named in the settings; `None` for plain passthrough.
    pub fn reducer(&self) -> Option<Reducer> {
        match self {
            FieldSettings::Detailed {
                reducer: Some(name),
                ..
            } => Some(Reducer::from_name(name)),
            _ => None,
        }
    }

    pub fn weights(&self) -> Option<&ColumnRef> {
        match self {
            FieldSettings::Detailed { weights, .. } => weights.as_ref(),
            _ => None,
        }
    }
}

/// Declarative mapping: output field name to binding.
pub type MappingSettings = BTreeMap<String, FieldSettings>;

pub fn mapping_settings_from_json(json: &str) -> Result<MappingSettings> {
    serde_json::from_str(json).wrap_err("invalid mapping settings")
}

/// Grouping ladder used by stock charts, 1ms up to 1 year.
pub fn default_grouping_levels() -> Vec<IntervalDescriptor> {
    use IntervalUnit::*;
    [
        (Millisecond, 1),
        (Millisecond, 5),
        (Millisecond, 10),
        (Millisecond, 25),
        (Millisecond, 50),
        (Millisecond, 100),
        (Millisecond, 250),
        (Millisecond, 500),
        (Second, 1),
        (Second, 5),
        (Second, 10),
        (Second, 20),
        (Second, 30),
        (Minute, 1),
        (Minute, 5),
        (Minute, 15),
        (Minute, 30),
        (Hour, 1),
        (Hour, 2),
        (Hour, 6),
        (Hour, 12),
        (Day, 1),
        (Week, 1),
        (Month, 1),
        (Month, 3),
        (Month, 6),
        (Year, 1),
    ]
    .into_iter()
    .map(|(unit, count)| IntervalDescriptor::new(unit, count))
    .collect()
}

/// Minor/major pairs for date-time axes, finest first.
pub fn default_tick_levels() -> Vec<TickLevel> {
    use IntervalUnit::*;
    [
        ((Millisecond, 1), (Millisecond, 5)),
        ((Millisecond, 5), (Millisecond, 20)),
        ((Millisecond, 20), (Millisecond, 100)),
        ((Millisecond, 100), (Millisecond, 500)),
        ((Millisecond, 500), (Second, 2)),
        ((Second, 2), (Second, 10)),
        ((Second, 10), (Second, 30)),
        ((Second, 30), (Minute, 2)),
        ((Minute, 2), (Minute, 10)),
        ((Minute, 10), (Minute, 30)),
        ((Minute, 30), (Hour, 1)),
        ((Hour, 1), (Hour, 3)),
        ((Hour, 3), (Hour, 12)),
        ((Hour, 12), (Day, 1)),
        ((Day, 1), (Week, 1)),
        ((Day, 2), (Week, 1)),
        ((Week, 1), (Month, 1)),
        ((Month, 1), (Quarter, 1)),
        ((Quarter, 1), (Semester, 1)),
        ((Semester, 1), (Year, 1)),
        ((Year, 1), (Year, 2)),
        ((Year, 2), (Year, 4)),
        ((Year, 3), (Year, 6)),
        ((Year, 4), (Year, 8)),
        ((Year, 5), (Year, 10)),
        ((Year, 6), (Year, 12)),
        ((Year, 7), (Year, 14)),
        ((Year, 8), (Year, 16)),
        ((Year, 9), (Year, 18)),
        ((Year, 10), (Year, 20)),
        ((Year, 20), (Year, 40)),
        ((Year, 25), (Year, 100)),
        ((Year, 100), (Year, 500)),
    ]
    .into_iter()
    .map(|((mu, mc), (ju, jc))| TickLevel::new(Interval::new(mu, mc), Interval::new(ju, jc)))
    .collect()
}
