use crate::data_types::{Interval, IntervalUnit};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// 2000-01-01T00:00:00Z, origin of every alignment grid.
const BASE_MS: i64 = 946_684_800_000;
/// 2000-01-02T00:00:00Z, a Sunday, so that weeks start on Sundays.
const WEEK_BASE_MS: i64 = 946_771_200_000;
const BASE_YEAR: i64 = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Fixed { ms: i64, base: i64 },
    Months(i64),
    Thirds(i64),
    Years(i64),
}

impl Step {
    fn of(interval: &Interval) -> Step {
        let count = interval.count.max(1) as i64;
        match interval.unit {
            IntervalUnit::Millisecond => Step::Fixed { ms: count, base: BASE_MS },
            IntervalUnit::Second => Step::Fixed { ms: count * 1_000, base: BASE_MS },
            IntervalUnit::Minute => Step::Fixed { ms: count * 60_000, base: BASE_MS },
            IntervalUnit::Hour => Step::Fixed { ms: count * 3_600_000, base: BASE_MS },
            IntervalUnit::Day => Step::Fixed { ms: count * 86_400_000, base: BASE_MS },
            IntervalUnit::Week => Step::Fixed { ms: count * 604_800_000, base: WEEK_BASE_MS },
            IntervalUnit::ThirdOfMonth => Step::Thirds(count),
            IntervalUnit::Month => Step::Months(count),
            IntervalUnit::Quarter => Step::Months(count * 3),
            IntervalUnit::Semester => Step::Months(count * 6),
            IntervalUnit::Year => Step::Years(count),
            IntervalUnit::Decade => Step::Years(count * 10),
        }
    }
}

fn date_parts(ts: i64) -> Option<(i64, i64, u32)> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .map(|dt| (dt.year() as i64, dt.month0() as i64, dt.day()))
}

fn date_ms(year: i64, month0: i64, day: u32) -> Option<i64> {
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month0 as u32 + 1, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn month_index(ts: i64) -> Option<i64> {
    let (year, month0, _) = date_parts(ts)?;
    Some(year * 12 + month0)
}

fn month_start(index: i64) -> Option<i64> {
    date_ms(index.div_euclid(12), index.rem_euclid(12), 1)
}

fn third_index(ts: i64) -> Option<i64> {
    let (year, month0, day) = date_parts(ts)?;
    let third = match day {
        1..=10 => 0,
        11..=20 => 1,
        _ => 2,
    };
    Some((year * 12 + month0) * 3 + third)
}

fn third_start(index: i64) -> Option<i64> {
    let month = index.div_euclid(3);
    let third = index.rem_euclid(3) as u32;
    date_ms(month.div_euclid(12), month.rem_euclid(12), 1 + third * 10)
}

fn floor_to(value: i64, base: i64, step: i64) -> Option<i64> {
    let offset = value.checked_sub(base)?;
    base.checked_add(offset.div_euclid(step).checked_mul(step)?)
}

/// Earliest and latest keys representable as calendar dates.
pub fn calendar_bounds() -> (i64, i64) {
    (
        DateTime::<Utc>::MIN_UTC.timestamp_millis(),
        DateTime::<Utc>::MAX_UTC.timestamp_millis(),
    )
}

/// Whether `ts` can be placed on the calendar.
pub fn is_calendar_key(ts: i64) -> bool {
    date_parts(ts).is_some()
}

/// Walks calendar-aligned interval starts in UTC.
///
/// Fixed units align on a grid based at 2000-01-01 (weeks at 2000-01-02).
/// Months, quarters and semesters align on the month index `year * 12 + month`,
/// thirds of a month start on days 1, 11 and 21, years and decades on year numbers.
/// Positions outside the calendar range yield `None`.
#[derive(Clone, Debug)]
pub struct IntervalGenerator {
    interval: Interval,
    step: Step,
    current: Option<i64>,
}

impl IntervalGenerator {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            step: Step::of(&interval),
            current: Some(BASE_MS),
        }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Start of the interval containing `ts`. Aligning an aligned key returns it unchanged.
    pub fn align(&self, ts: i64) -> Option<i64> {
        match self.step {
            Step::Fixed { ms, base } => floor_to(ts, base, ms),
            Step::Months(n) => month_start(floor_to(month_index(ts)?, BASE_YEAR * 12, n)?),
            Step::Thirds(n) => third_start(floor_to(third_index(ts)?, BASE_YEAR * 36, n)?),
            Step::Years(n) => {
                let (year, _, _) = date_parts(ts)?;
                date_ms(floor_to(year, BASE_YEAR, n)?, 0, 1)
            }
        }
    }

    /// Moves an aligned key by `count` intervals.
    pub fn shift(&self, aligned: i64, count: i64) -> Option<i64> {
        match self.step {
            Step::Fixed { ms, .. } => aligned.checked_add(count.checked_mul(ms)?),
            Step::Months(n) => month_start(month_index(aligned)? + count * n),
            Step::Thirds(n) => third_start(third_index(aligned)? + count * n),
            Step::Years(n) => {
                let (year, _, _) = date_parts(aligned)?;
                date_ms(year + count * n, 0, 1)
            }
        }
    }

    /// Positions the generator one interval before the start containing `ts`,
    /// so the following `next()` yields `align(ts)`.
    pub fn set_start(&mut self, ts: i64) -> &mut Self {
        self.current = self.align(ts).and_then(|a| self.shift(a, -1));
        self
    }

    pub fn next(&mut self) -> Option<i64> {
        self.current = self.current.and_then(|c| self.shift(c, 1));
        self.current
    }

    pub fn current(&self) -> Option<i64> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(y: i32, m: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn test_month_like_alignment() {
        let ts = ms(2021, 5, 15, 12);
        let month = IntervalGenerator::new(Interval::new(IntervalUnit::Month, 1));
        assert_eq!(month.align(ts), Some(ms(2021, 5, 1, 0)));
        let quarter = IntervalGenerator::new(Interval::new(IntervalUnit::Quarter, 1));
        assert_eq!(quarter.align(ts), Some(ms(2021, 4, 1, 0)));
        let semester = IntervalGenerator::new(Interval::new(IntervalUnit::Semester, 1));
        assert_eq!(semester.align(ts), Some(ms(2021, 1, 1, 0)));
        let third = IntervalGenerator::new(Interval::new(IntervalUnit::ThirdOfMonth, 1));
        assert_eq!(third.align(ts), Some(ms(2021, 5, 11, 0)));
        assert_eq!(third.align(ms(2021, 5, 31, 0)), Some(ms(2021, 5, 21, 0)));
    }

    #[test]
    fn test_week_and_decade_alignment() {
        // 2021-03-17 is a Wednesday.
        let week = IntervalGenerator::new(Interval::new(IntervalUnit::Week, 1));
        assert_eq!(week.align(ms(2021, 3, 17, 8)), Some(ms(2021, 3, 14, 0)));
        let decade = IntervalGenerator::new(Interval::new(IntervalUnit::Decade, 1));
        assert_eq!(decade.align(ms(2017, 7, 1, 0)), Some(ms(2010, 1, 1, 0)));
        assert_eq!(decade.align(ms(1995, 7, 1, 0)), Some(ms(1990, 1, 1, 0)));
    }

    #[test]
    fn test_alignment_idempotent() {
        let keys = [ms(1969, 12, 31, 23), ms(2003, 2, 28, 5), ms(2024, 2, 29, 17), 1_234_567];
        for unit in IntervalUnit::ALL {
            for count in [1, 2, 5] {
                let gen = IntervalGenerator::new(Interval::new(unit, count));
                for &k in &keys {
                    let a = gen.align(k).unwrap();
                    assert!(a <= k, "{unit} x{count}");
                    assert_eq!(gen.align(a), Some(a), "{unit} x{count}");
                }
            }
        }
    }

    #[test]
    fn test_set_start_and_next() {
        let mut gen = IntervalGenerator::new(Interval::new(IntervalUnit::Month, 1));
        gen.set_start(ms(2020, 12, 20, 0));
        assert_eq!(gen.next(), Some(ms(2020, 12, 1, 0)));
        assert_eq!(gen.next(), Some(ms(2021, 1, 1, 0)));
        assert_eq!(gen.next(), Some(ms(2021, 2, 1, 0)));

        let mut hours = IntervalGenerator::new(Interval::new(IntervalUnit::Hour, 6));
        hours.set_start(ms(2021, 1, 1, 7));
        assert_eq!(hours.next(), Some(ms(2021, 1, 1, 6)));
        assert_eq!(hours.next(), Some(ms(2021, 1, 1, 12)));
    }

    #[test]
    fn test_out_of_calendar_positions() {
        let month = IntervalGenerator::new(Interval::new(IntervalUnit::Month, 1));
        assert_eq!(month.align(10_000_000_000_000_000), None);
        assert_eq!(month.align(i64::MIN), None);
        assert!(!is_calendar_key(i64::MAX));
        assert!(is_calendar_key(0));

        let ms = IntervalGenerator::new(Interval::new(IntervalUnit::Millisecond, 1));
        assert_eq!(ms.shift(i64::MAX, 1), None);
        assert_eq!(ms.align(i64::MIN), None);
    }
}
