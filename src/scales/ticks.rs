use crate::data_types::Interval;
use crate::utils::interval_generator::calendar_bounds;
use crate::utils::IntervalGenerator;

/// One tick produced by a [`TicksIterator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub key: i64,
    pub major: bool,
    /// Registry index of the tick for ordinal scales.
    pub index: Option<usize>,
}

/// Cursor over the ticks of a scale.
///
/// `advance` moves to the next tick and returns false once past the end bound;
/// `current`, `is_major` and `current_index` describe the tick last advanced to.
pub trait TicksIterator {
    fn reset(&mut self);
    fn advance(&mut self) -> bool;
    fn current(&self) -> i64;
    fn is_major(&self) -> bool;

    fn current_index(&self) -> Option<usize> {
        None
    }
}

/// Resets `iter` and drains it.
pub fn collect_ticks(iter: &mut dyn TicksIterator) -> Vec<Tick> {
    iter.reset();
    let mut ticks = Vec::new();
    while iter.advance() {
        ticks.push(Tick {
            key: iter.current(),
            major: iter.is_major(),
            index: iter.current_index(),
        });
    }
    ticks
}

/// First aligned position at or after `start`, or `i64::MAX` past the calendar.
fn first_at_or_after(generator: &IntervalGenerator, start: i64) -> i64 {
    match generator.align(start) {
        Some(aligned) if aligned < start => generator.shift(aligned, 1).unwrap_or(i64::MAX),
        Some(aligned) => aligned,
        None => i64::MAX,
    }
}

/// Calendar-aligned ticks over a continuous key range.
///
/// Minor and major cadences run side by side; a key hit by both is reported once, as major.
#[derive(Clone, Debug)]
pub struct ScatterTicksIterator {
    start: i64,
    end: i64,
    major: IntervalGenerator,
    minor: IntervalGenerator,
    next_major: i64,
    next_minor: i64,
    current: i64,
    current_major: bool,
}

impl Default for ScatterTicksIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScatterTicksIterator {
    pub fn new() -> Self {
        let interval = Interval::default();
        Self {
            start: 0,
            end: -1,
            major: IntervalGenerator::new(interval),
            minor: IntervalGenerator::new(interval),
            next_major: 0,
            next_minor: 0,
            current: 0,
            current_major: false,
        }
    }

    pub fn setup(&mut self, start: i64, end: i64, major: Interval, minor: Interval) {
        let (first, last) = calendar_bounds();
        self.start = start.min(end).max(first);
        self.end = start.max(end).min(last);
        self.major = IntervalGenerator::new(major);
        self.minor = IntervalGenerator::new(minor);
        self.reset();
    }

    pub fn major_interval(&self) -> Interval {
        self.major.interval()
    }

    pub fn minor_interval(&self) -> Interval {
        self.minor.interval()
    }
}

impl TicksIterator for ScatterTicksIterator {
    fn reset(&mut self) {
        self.next_major = first_at_or_after(&self.major, self.start);
        self.next_minor = first_at_or_after(&self.minor, self.start);
        self.current = self.start;
        self.current_major = false;
    }

    fn advance(&mut self) -> bool {
        let candidate = self.next_major.min(self.next_minor);
        if candidate > self.end || candidate == i64::MAX {
            return false;
        }
        self.current_major = self.next_major == candidate;
        if self.next_major == candidate {
            self.next_major = self.major.shift(candidate, 1).unwrap_or(i64::MAX);
        }
        if self.next_minor == candidate {
            self.next_minor = self.minor.shift(candidate, 1).unwrap_or(i64::MAX);
        }
        self.current = candidate;
        true
    }

    fn current(&self) -> i64 {
        self.current
    }

    fn is_major(&self) -> bool {
        self.current_major
    }
}

/// Ticks placed on registered keys where an interval boundary is crossed.
///
/// A key is a tick when it lies in a different minor (or major) bucket than the key before it.
#[derive(Clone, Debug, Default)]
pub struct OrdinalTicksIterator {
    keys: Vec<i64>,
    first: usize,
    end: usize,
    next: usize,
    major: Option<IntervalGenerator>,
    minor: Option<IntervalGenerator>,
    current: Option<(usize, bool)>,
}

impl OrdinalTicksIterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates `keys[first_index..=last_index]`, clamped to the key count.
    pub fn setup(
        &mut self,
        keys: Vec<i64>,
        first_index: usize,
        last_index: usize,
        major: Interval,
        minor: Interval,
    ) {
        self.end = last_index.saturating_add(1).min(keys.len());
        self.first = first_index.min(self.end);
        self.keys = keys;
        self.major = Some(IntervalGenerator::new(major));
        self.minor = Some(IntervalGenerator::new(minor));
        self.reset();
    }

    fn classify(&self, i: usize) -> Option<bool> {
        let (major, minor) = (self.major.as_ref()?, self.minor.as_ref()?);
        let key = self.keys[i];
        let major_bucket = major.align(key);
        let minor_bucket = minor.align(key);
        let (is_major, is_minor) = match i.checked_sub(1).map(|p| self.keys[p]) {
            Some(prev) => (
                major.align(prev) != major_bucket,
                minor.align(prev) != minor_bucket,
            ),
            None => (major_bucket == Some(key), minor_bucket == Some(key)),
        };
        (is_major || is_minor).then_some(is_major)
    }
}

impl TicksIterator for OrdinalTicksIterator {
    fn reset(&mut self) {
        self.next = self.first;
        self.current = None;
    }

    fn advance(&mut self) -> bool {
        while self.next < self.end {
            let i = self.next;
            self.next += 1;
            if let Some(major) = self.classify(i) {
                self.current = Some((i, major));
                return true;
            }
        }
        false
    }

    fn current(&self) -> i64 {
        self.current.map_or(i64::MIN, |(i, _)| self.keys[i])
    }

    fn is_major(&self) -> bool {
        self.current.is_some_and(|(_, major)| major)
    }

    fn current_index(&self) -> Option<usize> {
        self.current.map(|(i, _)| i)
    }
}

/// User-supplied tick keys, all major.
#[derive(Clone, Debug, Default)]
pub struct ExplicitTicksIterator {
    ticks: Vec<i64>,
    next: usize,
}

impl ExplicitTicksIterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the sorted, distinct keys within `[start, end]`.
    pub fn setup(&mut self, mut ticks: Vec<i64>, start: i64, end: i64) {
        let (start, end) = (start.min(end), start.max(end));
        ticks.retain(|t| (start..=end).contains(t));
        ticks.sort_unstable();
        ticks.dedup();
        self.ticks = ticks;
        self.reset();
    }
}

impl TicksIterator for ExplicitTicksIterator {
    fn reset(&mut self) {
        self.next = 0;
    }

    fn advance(&mut self) -> bool {
        if self.next < self.ticks.len() {
            self.next += 1;
            true
        } else {
            false
        }
    }

    fn current(&self) -> i64 {
        self.next
            .checked_sub(1)
            .and_then(|i| self.ticks.get(i).copied())
            .unwrap_or(i64::MIN)
    }

    fn is_major(&self) -> bool {
        true
    }
}
