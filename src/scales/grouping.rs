use super::key_span;
use crate::data_types::{
    GroupingConfig, Interval, IntervalDescriptor, IntervalUnit, Observers, Selection, Signal,
    SubscriptionId,
};
use std::cmp::Ordering;
use tracing::debug;

/// One candidate aggregation interval with an optional own point budget.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupingLevel {
    pub interval: Interval,
    pub max_points: Option<f64>,
}

impl From<&IntervalDescriptor> for GroupingLevel {
    fn from(descriptor: &IntervalDescriptor) -> Self {
        Self {
            interval: descriptor.interval(),
            max_points: descriptor.max_points,
        }
    }
}

fn seed_levels() -> Vec<GroupingLevel> {
    vec![GroupingLevel {
        interval: Interval::new(IntervalUnit::Millisecond, 1),
        max_points: None,
    }]
}

/// Chooses the aggregation interval for a visible range.
///
/// Levels are kept sorted finest first and never empty.
#[derive(Clone, Debug)]
pub struct Grouping {
    enabled: bool,
    forced: bool,
    levels: Vec<GroupingLevel>,
    max_visible_points: f64,
    min_pix_per_point: Option<f64>,
    current: Interval,
    grouped: bool,
    observers: Observers,
}

impl Default for Grouping {
    fn default() -> Self {
        Self::new()
    }
}

impl Grouping {
    pub fn new() -> Self {
        Self {
            enabled: true,
            forced: false,
            levels: seed_levels(),
            max_visible_points: 500.0,
            min_pix_per_point: None,
            current: Interval::default(),
            grouped: false,
            observers: Observers::new(),
        }
    }

    /// Grouping with the stock ladder from 1 millisecond to 1 year.
    pub fn with_default_levels() -> Self {
        Self::from_config(&GroupingConfig::default())
    }

    pub fn from_config(config: &GroupingConfig) -> Self {
        let mut grouping = Self::new();
        grouping.enabled = config.enabled;
        grouping.forced = config.forced;
        grouping.max_visible_points = config.max_visible_points.max(2.0);
        grouping.min_pix_per_point = config.min_pix_per_point.map(|v| v.max(0.1));
        grouping.levels = Self::normalize_levels(&config.levels);
        grouping
    }

    fn normalize_levels(descriptors: &[IntervalDescriptor]) -> Vec<GroupingLevel> {
        let mut levels: Vec<GroupingLevel> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let level = GroupingLevel::from(descriptor);
            if !levels.iter().any(|l| l.interval == level.interval) {
                levels.push(level);
            }
        }
        if levels.is_empty() {
            return seed_levels();
        }
        levels.sort_by(|a, b| a.interval.compare(&b.interval));
        levels
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

    fn changed(&self) {
        self.observers.dispatch(Signal::NEEDS_REAPPLICATION);
    }

    pub fn levels(&self) -> &[GroupingLevel] {
        &self.levels
    }

    /// Replaces the levels; duplicates are dropped, an empty list restores the seed level.
    pub fn set_levels(&mut self, levels: &[IntervalDescriptor]) -> &mut Self {
        self.levels = Self::normalize_levels(levels);
        self.changed();
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.changed();
        }
        self
    }

    pub fn forced(&self) -> bool {
        self.forced
    }

    pub fn set_forced(&mut self, forced: bool) -> &mut Self {
        if self.forced != forced {
            self.forced = forced;
            self.changed();
        }
        self
    }

    pub fn max_visible_points(&self) -> f64 {
        self.max_visible_points
    }

    pub fn set_max_visible_points(&mut self, points: f64) -> &mut Self {
        let points = points.max(2.0);
        if self.max_visible_points != points {
            self.max_visible_points = points;
            self.changed();
        }
        self
    }

    pub fn min_pix_per_point(&self) -> Option<f64> {
        self.min_pix_per_point
    }

    /// When set, the point budget is derived from the plot width instead of `max_visible_points`.
    pub fn set_min_pix_per_point(&mut self, pixels: Option<f64>) -> &mut Self {
        let pixels = pixels.map(|p| p.max(0.1));
        if self.min_pix_per_point != pixels {
            self.min_pix_per_point = pixels;
            self.changed();
        }
        self
    }

    /// Finest level whose `range * max_points` covers `visible_range`; the coarsest otherwise.
    ///
    /// The budget is `points_override`, else the level's own `max_points`, else
    /// `max_visible_points`.
    pub fn choose_interval(&self, visible_range: f64, points_override: Option<f64>) -> Interval {
        let last = self.levels.len() - 1;
        for level in &self.levels[..last] {
            let points = points_override
                .or(level.max_points)
                .unwrap_or(self.max_visible_points);
            if level.interval.range() * points >= visible_range {
                return level.interval;
            }
        }
        self.levels[last].interval
    }

    fn first_interval_index(&self, min_distance: f64) -> usize {
        let i = self
            .levels
            .iter()
            .position(|l| l.interval.range() > min_distance)
            .unwrap_or(self.levels.len());
        i.saturating_sub(1)
    }

    fn acceptable_interval_index(&self, min_range: f64, from: usize) -> usize {
        self.levels[from..]
            .iter()
            .position(|l| l.interval.range().partial_cmp(&min_range) != Some(Ordering::Less))
            .map_or(self.levels.len() - 1, |i| from + i)
    }

    /// Decides grouping for the rows of `selection` drawn on `pixel_width` pixels.
    ///
    /// Returns the interval to aggregate at, or `None` when raw rows should be drawn.
    pub fn choose_for_selection(&mut self, pixel_width: f64, selection: &Selection) -> Option<Interval> {
        let target = match self.min_pix_per_point {
            Some(pixels) => (pixel_width / pixels).max(1.0),
            None => self.max_visible_points,
        };
        let min_distance = selection.min_distance;
        let count = selection.count() as f64;
        let group = self.enabled
            && min_distance > 0.0
            && (self.forced || count > target);

        let (interval, grouped) = if group {
            let range = key_span(selection.start_key, selection.end_key);
            let first = self.first_interval_index(min_distance);
            let index = self.acceptable_interval_index(range / target, first);
            (self.levels[index].interval, true)
        } else if min_distance > 0.0 {
            (Interval::estimate(min_distance), false)
        } else {
            (Interval::default(), false)
        };

        if interval != self.current || grouped != self.grouped {
            debug!(%interval, grouped, "grouping interval changed");
        }
        self.current = interval;
        self.grouped = grouped;
        grouped.then_some(interval)
    }

    /// Interval the data is currently shown at.
    pub fn current_data_interval(&self) -> Interval {
        self.current
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }
}
