use super::ema::ExponentialSmoother;
use super::{IndicatorStep, IndicatorValue};
use crate::computer::RowProxy;

/// Moving average convergence/divergence with its signal line and histogram.
#[derive(Clone, Debug)]
pub struct MacdContext {
    fast: ExponentialSmoother,
    slow: ExponentialSmoother,
    signal: ExponentialSmoother,
}

impl MacdContext {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: ExponentialSmoother::ema(fast),
            slow: ExponentialSmoother::ema(slow),
            signal: ExponentialSmoother::ema(signal),
        }
    }
}

impl IndicatorStep for MacdContext {
    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
    }

    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue {
        let value = row.get("value");
        let macd = self.fast.next(value) - self.slow.next(value);
        let signal = self.signal.next(macd);
        IndicatorValue::Macd {
            macd,
            signal,
            histogram: macd - signal,
        }
    }
}
