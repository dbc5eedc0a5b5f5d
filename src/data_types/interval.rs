use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const MS_PER_SECOND: f64 = 1000.0;
pub const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
pub const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
pub const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;
pub const MS_PER_WEEK: f64 = 7.0 * MS_PER_DAY;
pub const MS_PER_YEAR: f64 = 365.25 * MS_PER_DAY;

/// Calendar unit of an interval, finest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalUnit {
    #[serde(alias = "ms", alias = "milliseconds")]
    Millisecond,
    #[serde(alias = "s", alias = "seconds")]
    Second,
    #[serde(alias = "min", alias = "minutes")]
    Minute,
    #[serde(alias = "h", alias = "hours")]
    Hour,
    #[serde(alias = "d", alias = "days")]
    Day,
    #[serde(alias = "w", alias = "weeks")]
    Week,
    #[serde(alias = "third")]
    ThirdOfMonth,
    #[serde(alias = "months")]
    Month,
    #[serde(alias = "quarters")]
    Quarter,
    #[serde(alias = "semesters")]
    Semester,
    #[serde(alias = "y", alias = "years")]
    Year,
    #[serde(alias = "decades")]
    Decade,
}

impl IntervalUnit {
    pub const ALL: [IntervalUnit; 12] = [
        IntervalUnit::Millisecond,
        IntervalUnit::Second,
        IntervalUnit::Minute,
        IntervalUnit::Hour,
        IntervalUnit::Day,
        IntervalUnit::Week,
        IntervalUnit::ThirdOfMonth,
        IntervalUnit::Month,
        IntervalUnit::Quarter,
        IntervalUnit::Semester,
        IntervalUnit::Year,
        IntervalUnit::Decade,
    ];

    /// Approximate length of one unit in milliseconds.
    pub fn range_ms(self) -> f64 {
        match self {
            IntervalUnit::Millisecond => 1.0,
            IntervalUnit::Second => MS_PER_SECOND,
            IntervalUnit::Minute => MS_PER_MINUTE,
            IntervalUnit::Hour => MS_PER_HOUR,
            IntervalUnit::Day => MS_PER_DAY,
            IntervalUnit::Week => MS_PER_WEEK,
            IntervalUnit::ThirdOfMonth => MS_PER_YEAR / 36.0,
            IntervalUnit::Month => MS_PER_YEAR / 12.0,
            IntervalUnit::Quarter => MS_PER_YEAR / 4.0,
            IntervalUnit::Semester => MS_PER_YEAR / 2.0,
            IntervalUnit::Year => MS_PER_YEAR,
            IntervalUnit::Decade => MS_PER_YEAR * 10.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntervalUnit::Millisecond => "millisecond",
            IntervalUnit::Second => "second",
            IntervalUnit::Minute => "minute",
            IntervalUnit::Hour => "hour",
            IntervalUnit::Day => "day",
            IntervalUnit::Week => "week",
            IntervalUnit::ThirdOfMonth => "third-of-month",
            IntervalUnit::Month => "month",
            IntervalUnit::Quarter => "quarter",
            IntervalUnit::Semester => "semester",
            IntervalUnit::Year => "year",
            IntervalUnit::Decade => "decade",
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalUnit {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        if normalized == "ms" {
            return Ok(IntervalUnit::Millisecond);
        }
        let unit = match normalized.trim_end_matches('s') {
            "millisecond" => IntervalUnit::Millisecond,
            "" | "second" | "sec" => IntervalUnit::Second,
            "min" | "minute" => IntervalUnit::Minute,
            "h" | "hour" => IntervalUnit::Hour,
            "d" | "day" => IntervalUnit::Day,
            "w" | "week" => IntervalUnit::Week,
            "third-of-month" | "thirdofmonth" | "third" => IntervalUnit::ThirdOfMonth,
            "month" => IntervalUnit::Month,
            "quarter" => IntervalUnit::Quarter,
            "semester" => IntervalUnit::Semester,
            "y" | "year" => IntervalUnit::Year,
            "decade" => IntervalUnit::Decade,
            _ => eyre::bail!("unknown interval unit '{}'", s),
        };
        Ok(unit)
    }
}

/// A calendar interval: `count` consecutive `unit`s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub unit: IntervalUnit,
    pub count: u32,
}

impl Default for Interval {
    fn default() -> Self {
        Self::new(IntervalUnit::Millisecond, 1)
    }
}

impl Interval {
    pub fn new(unit: IntervalUnit, count: u32) -> Self {
        Self {
            unit,
            count: count.max(1),
        }
    }

    /// Approximate length in milliseconds.
    pub fn range(&self) -> f64 {
        self.unit.range_ms() * self.count as f64
    }

    /// Orders by range; for equal ranges the interval with the smaller count is bigger.
    pub fn compare(&self, other: &Interval) -> Ordering {
        self.range()
            .total_cmp(&other.range())
            .then(other.count.cmp(&self.count))
    }

    /// Rough interval of the given length, in the largest unit that fits it.
    pub fn estimate(distance_ms: f64) -> Interval {
        let unit = IntervalUnit::ALL
            .iter()
            .rev()
            .copied()
            .find(|u| u.range_ms() <= distance_ms)
            .unwrap_or(IntervalUnit::Millisecond);
        let count = (distance_ms / unit.range_ms()).round().max(1.0);
        Interval::new(unit, count as u32)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit)
    }
}

fn default_count() -> u32 {
    1
}

/// Interval as it appears in configuration: `{unit, count, maxPoints?}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntervalDescriptor {
    pub unit: IntervalUnit,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default, rename = "maxPoints", skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
}

impl IntervalDescriptor {
    pub fn new(unit: IntervalUnit, count: u32) -> Self {
        Self {
            unit,
            count,
            max_points: None,
        }
    }

    pub fn with_max_points(mut self, max_points: f64) -> Self {
        self.max_points = Some(max_points);
        self
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.unit, self.count)
    }
}

impl From<Interval> for IntervalDescriptor {
    fn from(interval: Interval) -> Self {
        Self::new(interval.unit, interval.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parsing() {
        assert_eq!("ms".parse::<IntervalUnit>().unwrap(), IntervalUnit::Millisecond);
        assert_eq!("Days".parse::<IntervalUnit>().unwrap(), IntervalUnit::Day);
        assert_eq!("third_of_month".parse::<IntervalUnit>().unwrap(), IntervalUnit::ThirdOfMonth);
        assert_eq!("decade".parse::<IntervalUnit>().unwrap(), IntervalUnit::Decade);
        assert!("fortnight".parse::<IntervalUnit>().is_err());
    }

    #[test]
    fn test_compare_equal_ranges() {
        let a = Interval::new(IntervalUnit::Month, 3);
        let b = Interval::new(IntervalUnit::Quarter, 1);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    #[test]
    fn test_estimate() {
        let i = Interval::estimate(2.0 * MS_PER_DAY);
        assert_eq!(i, Interval::new(IntervalUnit::Day, 2));
        assert_eq!(Interval::estimate(0.2), Interval::new(IntervalUnit::Millisecond, 1));
    }
}
