use crate::data_types::IntervalUnit;
use chrono::{TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartDateFormat {
    Year,         // 2024
    MonthYear,    // Jan 2024
    DayMonth,     // 12 Jan
    HourMin,      // 10:30
    HourMinSec,   // 10:30:15
    HourMinSecMs, // 10:30:15.250
}

/// Label format for ticks of the given unit.
pub fn format_for_unit(unit: IntervalUnit) -> SmartDateFormat {
    match unit {
        IntervalUnit::Year | IntervalUnit::Decade => SmartDateFormat::Year,
        IntervalUnit::Semester | IntervalUnit::Quarter | IntervalUnit::Month => {
            SmartDateFormat::MonthYear
        }
        IntervalUnit::ThirdOfMonth | IntervalUnit::Week | IntervalUnit::Day => {
            SmartDateFormat::DayMonth
        }
        IntervalUnit::Hour | IntervalUnit::Minute => SmartDateFormat::HourMin,
        IntervalUnit::Second => SmartDateFormat::HourMinSec,
        IntervalUnit::Millisecond => SmartDateFormat::HourMinSecMs,
    }
}

/// Formats an epoch-millisecond key in UTC.
pub fn format_timestamp(key: i64, format: SmartDateFormat) -> String {
    let dt = match Utc.timestamp_millis_opt(key) {
        chrono::LocalResult::Single(d) => d,
        chrono::LocalResult::Ambiguous(d, _) => d,
        chrono::LocalResult::None => return key.to_string(),
    };

    match format {
        SmartDateFormat::Year => dt.format("%Y").to_string(),
        SmartDateFormat::MonthYear => dt.format("%b %Y").to_string(),
        SmartDateFormat::DayMonth => dt.format("%d %b").to_string(),
        SmartDateFormat::HourMin => dt.format("%H:%M").to_string(),
        SmartDateFormat::HourMinSec => dt.format("%H:%M:%S").to_string(),
        SmartDateFormat::HourMinSecMs => dt.format("%H:%M:%S%.3f").to_string(),
    }
}

pub fn format_tick(key: i64, unit: IntervalUnit) -> String {
    format_timestamp(key, format_for_unit(unit))
}
