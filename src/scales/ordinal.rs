use super::grouping::Grouping;
use super::{key_span, pick_tick_level};
use super::registry::KeyIndexRegistry;
use super::ticks::{collect_ticks, OrdinalTicksIterator, Tick};
use crate::data_types::{
    default_tick_levels, Interval, Observers, ScaleConfig, Signal, SubscriptionId, TickLevel,
};
use crate::utils::date_formatter::format_tick;

/// Date-time scale spacing registered keys evenly, skipping gaps between them.
#[derive(Clone, Debug)]
pub struct OrdinalScale {
    registry: KeyIndexRegistry,
    min_index: f64,
    max_index: f64,
    ticks_count: usize,
    levels: Vec<TickLevel>,
    grouping: Grouping,
    ticks: OrdinalTicksIterator,
    major: Interval,
    minor: Interval,
    observers: Observers,
}

impl Default for OrdinalScale {
    fn default() -> Self {
        Self::new()
    }
}

impl OrdinalScale {
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
            registry: KeyIndexRegistry::default(),
            min_index: f64::NAN,
            max_index: f64::NAN,
            ticks_count: config.ticks_count.max(1),
            levels,
            grouping: Grouping::from_config(&config.grouping),
            ticks: OrdinalTicksIterator::new(),
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

    pub fn registry(&self) -> &KeyIndexRegistry {
        &self.registry
    }

    /// Installs a new key set; an unset visible range becomes the full one.
    pub fn set_registry(&mut self, registry: KeyIndexRegistry) -> &mut Self {
        self.registry = registry;
        if (self.min_index.is_nan() || self.max_index.is_nan()) && !self.registry.is_empty() {
            self.min_index = 0.0;
            self.max_index = (self.registry.len() - 1) as f64;
        }
        self.observers.dispatch(Signal::NEED_UPDATE_FULL_RANGE_ITEMS);
        self
    }

    pub fn set_current_range(&mut self, start_key: i64, end_key: i64) -> &mut Self {
        let (start, end) = (start_key.min(end_key), start_key.max(end_key));
        self.set_index_range(self.registry.index_by_key(start), self.registry.index_by_key(end))
    }

    pub fn set_index_range(&mut self, min_index: f64, max_index: f64) -> &mut Self {
        self.min_index = min_index.min(max_index);
        self.max_index = min_index.max(max_index);
        self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        self
    }

    pub fn index_range(&self) -> (f64, f64) {
        (self.min_index, self.max_index)
    }

    pub fn current_range(&self) -> Option<(i64, i64)> {
        Some((
            self.registry.key_by_index(self.min_index)?,
            self.registry.key_by_index(self.max_index)?,
        ))
    }

    pub fn transform_index(&self, index: f64) -> f64 {
        let span = self.max_index - self.min_index;
        if span > 0.0 {
            (index - self.min_index) / span
        } else if span == 0.0 {
            0.0
        } else {
            f64::NAN
        }
    }

    /// Ratio of `key` within the visible index range.
    pub fn transform(&self, key: i64) -> f64 {
        self.transform_index(self.registry.index_by_key(key))
    }

    pub fn inverse_transform(&self, ratio: f64) -> Option<i64> {
        let index = self.min_index + ratio * (self.max_index - self.min_index);
        self.registry.key_by_index(index)
    }

    pub fn align_key(&self, key: i64) -> Option<i64> {
        self.registry.align_key(key)
    }

    pub fn ticks_count(&self) -> usize {
        self.ticks_count
    }

    pub fn set_ticks_count(&mut self, count: usize) -> &mut Self {
        self.ticks_count = count.max(1);
        self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        self
    }

    pub fn set_tick_levels(&mut self, levels: Vec<TickLevel>) -> &mut Self {
        self.levels = if levels.is_empty() {
            default_tick_levels()
        } else {
            levels
        };
        self.observers.dispatch(Signal::NEED_UPDATE_TICK_DEPENDENT);
        self
    }

    pub fn calculate(&mut self) {
        let Some((start, end)) = self.current_range() else {
            return;
        };
        let minor_tick_range = key_span(start, end).abs() / self.ticks_count as f64;
        if let Some((major, minor)) = pick_tick_level(&self.levels, minor_tick_range) {
            self.major = major;
            self.minor = minor;
        }
        let last = (self.registry.len() - 1) as f64;
        let first = self.min_index.ceil().clamp(0.0, last) as usize;
        let end_index = self.max_index.floor().clamp(0.0, last) as usize;
        self.ticks.setup(
            self.registry.keys().to_vec(),
            first,
            end_index,
            self.major,
            self.minor,
        );
    }

    pub fn ticks(&mut self) -> Vec<Tick> {
        if self.current_range().is_none() {
            return Vec::new();
        }
        self.calculate();
        collect_ticks(&mut self.ticks)
    }

    pub fn major_interval(&self) -> Interval {
        self.major
    }

    pub fn minor_interval(&self) -> Interval {
        self.minor
    }

    pub fn format_tick(&self, key: i64) -> String {
        format_tick(key, self.major.unit)
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    pub fn grouping_mut(&mut self) -> &mut Grouping {
        &mut self.grouping
    }

    pub fn choose_interval(&self, points_override: Option<f64>) -> Option<Interval> {
        let (start, end) = self.current_range()?;
        Some(self.grouping.choose_interval(key_span(start, end), points_override))
    }
}
