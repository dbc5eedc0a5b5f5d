use super::{IndicatorStep, IndicatorValue};
use crate::computer::{CycledQueue, RowProxy};

/// Difference between the current value and the value `period` rows back.
#[derive(Clone, Debug)]
pub struct MomentumContext {
    queue: CycledQueue,
}

impl MomentumContext {
    pub fn new(period: usize) -> Self {
        Self {
            queue: CycledQueue::new(period + 1),
        }
    }
}

impl IndicatorStep for MomentumContext {
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
        IndicatorValue::Single(self.queue.get(-1) - self.queue.get(0))
    }
}
