use super::grouping::Grouping;
use super::{key_span, pick_tick_level};
use super::ticks::{collect_ticks, ExplicitTicksIterator, ScatterTicksIterator, Tick};
use crate::data_types::{
    default_tick_levels, Interval, Observers, ScaleConfig, Signal, SubscriptionId, TickLevel,
};
use crate::utils::date_formatter::format_tick;
use tracing::trace;

/// Continuous date-time scale mapping keys linearly onto `[0, 1]`.
#[derive(Clone, Debug)]
pub struct ScatterScale {
    full: Option<(i64, i64)>,
    visible: Option<(i64, i64)>,
    ticks_count: usize,
    levels: Vec<TickLevel>,
    grouping: Grouping,
    ticks: ScatterTicksIterator,
    explicit: Option<Vec<i64>>,
    explicit_ticks: ExplicitTicksIterator,
    major: Interval,
    minor: Interval,
    observers: Observers,
}

impl Default for ScatterScale {
    fn default() -> Self {
        Self::new()
    }
}

impl ScatterScale {
    pub fn new() -> Self {
        Self::from_config(&ScaleConfig::default())
    }

    pub fn from_config(config: &ScaleConfig) -> Self {
        let levels = if config.levels.is_empty() {
            default_tick_levels()
        } else {
            config.levels.clone()
        };
        Self {
            full: None,
            visible: None,
            ticks_count: config.ticks_count.max(1),
            levels,
            grouping: Grouping::from_config(&config.grouping),
            ticks: ScatterTicksIterator::new(),
            explicit: None,
            explicit_ticks: ExplicitTicksIterator::new(),
            major: Interval::default(),
            minor: Interval::default(),
            observers: Observers::new(),
        }
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

    /// Sets the full data range; the visible range follows it until set explicitly.
    pub fn set_full_range(&mut self, min: i64, max: i64) -> &mut Self {
        let range = (min.min(max), min.max(max));
        if self.full != Some(range) {
            self.full = Some(range);
            if self.visible.is_none() {
                self.visible = Some(range);
            }
            self.observers.dispatch(Signal::NEED_UPDATE_FULL_RANGE_ITEMS);
        }
        self
    }

    pub fn full_range(&self) -> Option<(i64, i64)> {
        self.full
    }

    pub fn set_current_range(&mut self, start: i64, end: i64) -> &mut Self {
        let range = (start.min(end), start.max(end));
        if self.visible != Some(range) {
            self.visible = Some(range);
            self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        }
        self
    }

    pub fn current_range(&self) -> Option<(i64, i64)> {
        self.visible
    }

    /// Ratio of `key` within the visible range; 0 for an empty or degenerate range.
    pub fn transform(&self, key: i64) -> f64 {
        match self.visible {
            Some((min, max)) if max > min => key_span(min, key) / key_span(min, max),
            _ => 0.0,
        }
    }

    pub fn inverse_transform(&self, ratio: f64) -> Option<i64> {
        let (min, max) = self.visible?;
        Some((min as f64 + ratio * key_span(min, max)).round() as i64)
    }

    pub fn ticks_count(&self) -> usize {
        self.ticks_count
    }

    pub fn set_ticks_count(&mut self, count: usize) -> &mut Self {
        let count = count.max(1);
        if self.ticks_count != count {
            self.ticks_count = count;
            self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        }
        self
    }

    pub fn tick_levels(&self) -> &[TickLevel] {
        &self.levels
    }

    /// Replaces the tick ladder; an empty ladder restores the default one.
    pub fn set_tick_levels(&mut self, levels: Vec<TickLevel>) -> &mut Self {
        self.levels = if levels.is_empty() {
            default_tick_levels()
        } else {
            levels
        };
        self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        self
    }

    /// Overrides computed ticks with fixed keys; `None` returns to calendar ticks.
    pub fn set_explicit_ticks(&mut self, ticks: Option<Vec<i64>>) -> &mut Self {
        self.explicit = ticks;
        self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        self
    }

    /// Picks the tick intervals for the visible range and prepares the iterator.
    pub fn calculate(&mut self) {
        let Some((min, max)) = self.visible else {
            return;
        };
        let minor_tick_range = key_span(min, max).abs() / self.ticks_count as f64;
        if let Some((major, minor)) = pick_tick_level(&self.levels, minor_tick_range) {
            self.major = major;
            self.minor = minor;
        }
        trace!(major = %self.major, minor = %self.minor, "scatter ticks calculated");
        match &self.explicit {
            Some(explicit) => self.explicit_ticks.setup(explicit.clone(), min, max),
            None => self.ticks.setup(min, max, self.major, self.minor),
        }
    }

    pub fn ticks(&mut self) -> Vec<Tick> {
        self.calculate();
        if self.visible.is_none() {
            return Vec::new();
        }
        if self.explicit.is_some() {
            collect_ticks(&mut self.explicit_ticks)
        } else {
            collect_ticks(&mut self.ticks)
        }
    }

    pub fn major_interval(&self) -> Interval {
        self.major
    }

    pub fn minor_interval(&self) -> Interval {
        self.minor
    }

    /// Label for a tick at the granularity of the current major interval.
    pub fn format_tick(&self, key: i64) -> String {
        format_tick(key, self.major.unit)
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    pub fn grouping_mut(&mut self) -> &mut Grouping {
        &mut self.grouping
    }

    /// Aggregation interval for the visible range.
    pub fn choose_interval(&self, points_override: Option<f64>) -> Option<Interval> {
        let (min, max) = self.visible?;
        Some(self.grouping.choose_interval(key_span(min, max), points_override))
    }
}
