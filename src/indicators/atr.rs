use super::{IndicatorStep, IndicatorValue};
use crate::computer::{CycledQueue, RowProxy};

/// Average true range over `high`, `low` and `close`.
///
/// The first row's true range is `high - low`. The average is seeded with the
/// mean of the first `period` true ranges and Wilder-smoothed afterwards.
#[derive(Clone, Debug)]
pub struct AtrContext {
    period: usize,
    queue: CycledQueue,
    prev_close: f64,
    atr: f64,
}

impl AtrContext {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            queue: CycledQueue::new(period),
            prev_close: f64::NAN,
            atr: f64::NAN,
        }
    }
}

fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let range = high - low;
    if prev_close.is_nan() {
        return range;
    }
    range
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

impl IndicatorStep for AtrContext {
    fn reset(&mut self) {
        self.queue.clear();
        self.prev_close = f64::NAN;
        self.atr = f64::NAN;
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        let (high, low, close) = (row.get("high"), row.get("low"), row.get("close"));
        if high.is_nan() || low.is_nan() || close.is_nan() {
            return IndicatorValue::Single(f64::NAN);
        }
        let tr = true_range(high, low, self.prev_close);
        self.prev_close = close;

        if self.atr.is_nan() {
            self.queue.enqueue(tr);
            if self.queue.len() < self.period {
                return IndicatorValue::Single(f64::NAN);
            }
            self.atr = self.queue.mean();
        } else {
            let p = self.period as f64;
            self.atr = (self.atr * (p - 1.0) + tr) / p;
        }
        IndicatorValue::Single(self.atr)
    }
}
