//! Technical indicators computed as table computers.
//!
//! Every indicator is a typed context implementing [`IndicatorStep`]. The
//! [`IndicatorContext`] sum type plugs them into the table as a [`Calculation`].

pub mod atr;
pub mod ema;
pub mod macd;
pub mod mma;
pub mod momentum;
pub mod roc;
pub mod rsi;
pub mod sma;

pub use atr::AtrContext;
pub use ema::{EmaContext, ExponentialSmoother};
pub use macd::MacdContext;
pub use mma::MmaContext;
pub use momentum::MomentumContext;
pub use roc::RocContext;
pub use rsi::RsiContext;
pub use sma::SmaContext;

use crate::computer::{Calculation, RowProxy, TableComputer};
use crate::data_types::Interval;
use crate::mapping::TableMapping;
use eyre::{bail, Result};
use serde::{Deserialize, Serialize};

/// Output of one indicator step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndicatorValue {
    Single(f64),
    Macd { macd: f64, signal: f64, histogram: f64 },
}

impl IndicatorValue {
    fn write(self, row: &mut RowProxy<'_>) {
        match self {
            IndicatorValue::Single(value) => row.set_at(0, value),
            IndicatorValue::Macd {
                macd,
                signal,
                histogram,
            } => {
                row.set_at(0, macd);
                row.set_at(1, signal);
                row.set_at(2, histogram);
            }
        }
    }
}

/// Windowed state machine of one indicator.
pub trait IndicatorStep {
    /// Forgets all samples.
    fn reset(&mut self);

    /// Consumes the current row; NaN while warming up.
    fn step(&mut self, row: &RowProxy<'_>) -> IndicatorValue;
}

#[derive(Clone, Debug)]
pub enum IndicatorContext {
    Sma(SmaContext),
    Ema(EmaContext),
    Mma(MmaContext),
    Roc(RocContext),
    Momentum(MomentumContext),
    Rsi(RsiContext),
    Atr(AtrContext),
    Macd(MacdContext),
}

impl IndicatorContext {
    fn inner(&mut self) -> &mut dyn IndicatorStep {
        match self {
            IndicatorContext::Sma(c) => c,
            IndicatorContext::Ema(c) => c,
            IndicatorContext::Mma(c) => c,
            IndicatorContext::Roc(c) => c,
            IndicatorContext::Momentum(c) => c,
            IndicatorContext::Rsi(c) => c,
            IndicatorContext::Atr(c) => c,
            IndicatorContext::Macd(c) => c,
        }
    }
}

impl Calculation for IndicatorContext {
    fn start(&mut self) {
        self.inner().reset();
    }

    fn step(&mut self, row: &mut RowProxy<'_>) {
        let value = self.inner().step(row);
        value.write(row);
    }

    fn box_clone(&self) -> Box<dyn Calculation> {
        Box::new(self.clone())
    }
}

/// Indicator type and parameters, as found in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IndicatorKind {
    Sma { period: usize },
    Ema { period: usize },
    Mma { period: usize },
    Roc { period: usize },
    Momentum { period: usize },
    Rsi { period: usize },
    Atr { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
}

impl IndicatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Sma { .. } => "sma",
            IndicatorKind::Ema { .. } => "ema",
            IndicatorKind::Mma { .. } => "mma",
            IndicatorKind::Roc { .. } => "roc",
            IndicatorKind::Momentum { .. } => "momentum",
            IndicatorKind::Rsi { .. } => "rsi",
            IndicatorKind::Atr { .. } => "atr",
            IndicatorKind::Macd { .. } => "macd",
        }
    }

    /// Mapping fields the indicator reads.
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Atr { .. } => &["high", "low", "close"],
            _ => &["value"],
        }
    }

    /// Output field names, in computed column order.
    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Macd { .. } => &["macd", "signal", "histogram"],
            _ => &["value"],
        }
    }

    /// Main period; the slow period for MACD.
    pub fn period(&self) -> usize {
        match *self {
            IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Mma { period }
            | IndicatorKind::Roc { period }
            | IndicatorKind::Momentum { period }
            | IndicatorKind::Rsi { period }
            | IndicatorKind::Atr { period } => period,
            IndicatorKind::Macd { slow, .. } => slow,
        }
    }

    fn with_period(self, period: usize) -> Result<Self> {
        Ok(match self {
            IndicatorKind::Sma { .. } => IndicatorKind::Sma { period },
            IndicatorKind::Ema { .. } => IndicatorKind::Ema { period },
            IndicatorKind::Mma { .. } => IndicatorKind::Mma { period },
            IndicatorKind::Roc { .. } => IndicatorKind::Roc { period },
            IndicatorKind::Momentum { .. } => IndicatorKind::Momentum { period },
            IndicatorKind::Rsi { .. } => IndicatorKind::Rsi { period },
            IndicatorKind::Atr { .. } => IndicatorKind::Atr { period },
            IndicatorKind::Macd { .. } => bail!("MACD has three periods, use set_macd_periods"),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let valid = match *self {
            IndicatorKind::Macd { fast, slow, signal } => fast > 0 && slow > 0 && signal > 0,
            _ => self.period() > 0,
        };
        if !valid {
            bail!("{} period must be at least 1", self.name());
        }
        Ok(())
    }

    /// Fresh calculation state for this kind.
    pub fn context(&self) -> IndicatorContext {
        match *self {
            IndicatorKind::Sma { period } => IndicatorContext::Sma(SmaContext::new(period)),
            IndicatorKind::Ema { period } => IndicatorContext::Ema(EmaContext::new(period)),
            IndicatorKind::Mma { period } => IndicatorContext::Mma(MmaContext::new(period)),
            IndicatorKind::Roc { period } => IndicatorContext::Roc(RocContext::new(period)),
            IndicatorKind::Momentum { period } => {
                IndicatorContext::Momentum(MomentumContext::new(period))
            }
            IndicatorKind::Rsi { period } => IndicatorContext::Rsi(RsiContext::new(period)),
            IndicatorKind::Atr { period } => IndicatorContext::Atr(AtrContext::new(period)),
            IndicatorKind::Macd { fast, slow, signal } => {
                IndicatorContext::Macd(MacdContext::new(fast, slow, signal))
            }
        }
    }
}

/// An indicator attached to a table through its own computer.
#[derive(Debug)]
pub struct Indicator {
    kind: IndicatorKind,
    computer: TableComputer,
}

impl Indicator {
    /// Registers the indicator over `mapping`, which must provide the kind's input fields.
    pub fn create(mapping: &TableMapping, kind: IndicatorKind) -> Result<Self> {
        kind.validate()?;
        for input in kind.inputs() {
            if !mapping.has_field(input) {
                bail!("{} needs a '{}' field in its mapping", kind.name(), input);
            }
        }

        let computer = mapping.table().create_computer(mapping)?;
        let setup = || -> Result<()> {
            for output in kind.outputs() {
                computer.add_output_field(&format!("{}-{}-{}", kind.name(), computer.id(), output))?;
            }
            computer.set_calculation(kind.context())?;
            Ok(())
        };
        if let Err(err) = setup() {
            computer.dispose();
            return Err(err);
        }
        Ok(Self { kind, computer })
    }

    pub fn sma(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Sma { period })
    }

    pub fn ema(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Ema { period })
    }

    pub fn mma(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Mma { period })
    }

    pub fn roc(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Roc { period })
    }

    pub fn momentum(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Momentum { period })
    }

    pub fn rsi(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Rsi { period })
    }

    pub fn atr(mapping: &TableMapping, period: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Atr { period })
    }

    pub fn macd(mapping: &TableMapping, fast: usize, slow: usize, signal: usize) -> Result<Self> {
        Self::create(mapping, IndicatorKind::Macd { fast, slow, signal })
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub fn period(&self) -> usize {
        self.kind.period()
    }

    pub fn computer(&self) -> &TableComputer {
        &self.computer
    }

    /// Changes the period and recomputes every row.
    pub fn set_period(&mut self, period: usize) -> Result<()> {
        let kind = self.kind.with_period(period)?;
        self.set_kind(kind)
    }

    pub fn set_macd_periods(&mut self, fast: usize, slow: usize, signal: usize) -> Result<()> {
        if !matches!(self.kind, IndicatorKind::Macd { .. }) {
            bail!("{} is not a MACD indicator", self.kind.name());
        }
        self.set_kind(IndicatorKind::Macd { fast, slow, signal })
    }

    fn set_kind(&mut self, kind: IndicatorKind) -> Result<()> {
        kind.validate()?;
        if kind == self.kind {
            return Ok(());
        }
        self.kind = kind;
        self.reinit_computer()
    }

    /// Replaces the calculation state with a fresh one; all rows are recomputed on next read.
    pub fn reinit_computer(&self) -> Result<()> {
        self.computer.set_calculation(self.kind.context())?;
        Ok(())
    }

    /// Mapping of the outputs under their short names (`value`, or `macd`/`signal`/`histogram`).
    pub fn output(&self, interval: Option<Interval>) -> TableMapping {
        let mut mapping = self.computer.table().mapping().with_interval(interval);
        for (name, (_, column)) in self.kind.outputs().iter().zip(self.computer.output_fields()) {
            mapping.add_computed_field(name, column);
        }
        mapping
    }

    /// Detaches the indicator from its table.
    pub fn dispose(self) {
        self.computer.dispose();
    }
}
