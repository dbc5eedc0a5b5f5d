use super::{IndicatorStep, IndicatorValue};
use crate::computer::{CycledQueue, RowProxy};

/// Simple moving average of `value`.
#[derive(Clone, Debug)]
pub struct SmaContext {
    period: usize,
    queue: CycledQueue,
}

impl SmaContext {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            queue: CycledQueue::new(period),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl IndicatorStep for SmaContext {
    fn reset(&mut self) {
        self.queue.clear();
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        let value = row.get("value");
        if value.is_nan() {
            return IndicatorValue::Single(f64::NAN);
        }
        self.queue.enqueue(value);
        if self.queue.len() < self.period {
            IndicatorValue::Single(f64::NAN)
        } else {
            IndicatorValue::Single(self.queue.mean())
        }
    }
}
