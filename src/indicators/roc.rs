use super::{IndicatorStep, IndicatorValue};
use crate::computer::{CycledQueue, RowProxy};

/// Rate of change in percent against the value `period` rows back.
#[derive(Clone, Debug)]
pub struct RocContext {
    queue: CycledQueue,
}

impl RocContext {
    pub fn new(period: usize) -> Self {
        Self {
            queue: CycledQueue::new(period + 1),
        }
    }
}

impl IndicatorStep for RocContext {
    fn reset(&mut self) {
        self.queue.clear();
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        let value = row.get("value");
        if value.is_nan() {
            return IndicatorValue::Single(f64::NAN);
        }
        self.queue.enqueue(value);
        if !self.queue.is_full() {
            return IndicatorValue::Single(f64::NAN);
        }
        let first = self.queue.get(0);
        IndicatorValue::Single(100.0 * (self.queue.get(-1) - first) / first)
    }
}
