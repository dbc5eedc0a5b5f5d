use super::{IndicatorStep, IndicatorValue};
use crate::computer::{CycledQueue, RowProxy};

/// Exponential smoothing seeded with the simple average of the first `period` samples.
#[derive(Clone, Debug)]
pub struct ExponentialSmoother {
    period: usize,
    alpha: f64,
    queue: CycledQueue,
    prev: f64,
}

impl ExponentialSmoother {
    pub fn new(period: usize, alpha: f64) -> Self {
        Self {
            period,
            alpha,
            queue: CycledQueue::new(period),
            prev: f64::NAN,
        }
    }

    /// Smoothing factor `2 / (period + 1)`.
    pub fn ema(period: usize) -> Self {
        Self::new(period, 2.0 / (period as f64 + 1.0))
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.prev = f64::NAN;
    }

    /// Feeds one sample. NaN samples yield NaN and leave the state untouched.
    pub fn next(&mut self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        if self.prev.is_nan() {
            self.queue.enqueue(value);
            if self.queue.len() < self.period {
                return f64::NAN;
            }
            self.prev = self.queue.mean();
        } else {
            self.prev += self.alpha * (value - self.prev);
        }
        self.prev
    }
}

/// Exponential moving average of `value`.
#[derive(Clone, Debug)]
pub struct EmaContext {
    smoother: ExponentialSmoother,
}

impl EmaContext {
    pub fn new(period: usize) -> Self {
        Self {
            smoother: ExponentialSmoother::ema(period),
        }
    }
}

impl IndicatorStep for EmaContext {
    fn reset(&mut self) {
        self.smoother.reset();
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        IndicatorValue::Single(self.smoother.next(row.get("value")))
    }
}
