//! Date-time scales: interval selection, key/index registries and tick iterators.

pub mod grouping;
pub mod ordinal;
pub mod registry;
pub mod scatter;
pub mod ticks;

pub use grouping::{Grouping, GroupingLevel};
pub use ordinal::OrdinalScale;
pub use registry::KeyIndexRegistry;
pub use scatter::ScatterScale;
pub use ticks::{
    collect_ticks, ExplicitTicksIterator, OrdinalTicksIterator, ScatterTicksIterator, Tick,
    TicksIterator,
};

use crate::data_types::{Interval, TickLevel};

/// Distance from `start` to `end`, exact enough for ratios and free of i64 overflow.
pub(crate) fn key_span(start: i64, end: i64) -> f64 {
    end as f64 - start as f64
}

/// Picks the first level whose minor interval covers `minor_tick_range`, else the coarsest.
pub(crate) fn pick_tick_level(levels: &[TickLevel], minor_tick_range: f64) -> Option<(Interval, Interval)> {
    levels
        .iter()
        .find(|level| level.minor.interval().range() >= minor_tick_range)
        .or_else(|| levels.last())
        .map(|level| (level.major.interval(), level.minor.interval()))
}
