use super::{IndicatorStep, IndicatorValue};
use crate::computer::{CycledQueue, RowProxy};

/// Relative strength index with Wilder smoothing of gains and losses.
#[derive(Clone, Debug)]
pub struct RsiContext {
    period: usize,
    queue: CycledQueue,
    avg_gain: f64,
    avg_loss: f64,
}

impl RsiContext {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            queue: CycledQueue::new(period + 1),
            avg_gain: f64::NAN,
            avg_loss: f64::NAN,
        }
    }

    fn seed(&mut self) {
        let (mut gains, mut losses) = (0.0, 0.0);
        let mut prev = self.queue.get(0);
        for value in self.queue.iter().skip(1) {
            let change = value - prev;
            if change > 0.0 {
                gains += change;
            } else {
                losses -= change;
            }
            prev = value;
        }
        let p = self.period as f64;
        self.avg_gain = gains / p;
        self.avg_loss = losses / p;
    }
}

impl IndicatorStep for RsiContext {
    fn reset(&mut self) {
        self.queue.clear();
        self.avg_gain = f64::NAN;
        self.avg_loss = f64::NAN;
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        let value = row.get("value");
        if value.is_nan() {
            return IndicatorValue::Single(f64::NAN);
        }

        if self.avg_gain.is_nan() {
            self.queue.enqueue(value);
            if !self.queue.is_full() {
                return IndicatorValue::Single(f64::NAN);
            }
            self.seed();
        } else {
            let change = value - self.queue.get(-1);
            self.queue.enqueue(value);
            let p = self.period as f64;
            self.avg_gain = (self.avg_gain * (p - 1.0) + change.max(0.0)) / p;
            self.avg_loss = (self.avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
        }

        IndicatorValue::Single(100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss))
    }
}
