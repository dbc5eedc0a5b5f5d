pub mod date_formatter;
pub mod interval_generator;

pub use interval_generator::IntervalGenerator;
