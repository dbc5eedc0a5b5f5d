use super::ema::ExponentialSmoother;
use super::{IndicatorStep, IndicatorValue};
use crate::computer::RowProxy;

/// Modified (Wilder) moving average: exponential smoothing with `1 / period`.
#[derive(Clone, Debug)]
pub struct MmaContext {
    smoother: ExponentialSmoother,
}

impl MmaContext {
    pub fn new(period: usize) -> Self {
        Self {
            smoother: ExponentialSmoother::new(period, 1.0 / period.max(1) as f64),
        }
    }
}

impl IndicatorStep for MmaContext {
    fn reset(&mut self) {
        self.smoother.reset();
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        IndicatorValue::Single(self.smoother.next(row.get("value")))
    }
}
