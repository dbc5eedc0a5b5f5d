use crate::data_types::{ColumnRef, RowValues, TableConfig};
use crate::utils::interval_generator::is_calendar_key;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

const DATE_TIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Truncates `f` to i64, rejecting values the cast would saturate.
fn float_key(f: f64) -> Option<i64> {
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Normalizes row keys to epoch milliseconds.
#[derive(Clone, Debug)]
pub(crate) struct KeyParser {
    column: ColumnRef,
    pattern: Option<String>,
    timezone: Option<chrono_tz::Tz>,
    offset_ms: i64,
}

impl KeyParser {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            column: config.key_column.clone(),
            pattern: config.date_time_pattern.clone(),
            timezone: config.timezone,
            offset_ms: (config.time_offset_hours * 3_600_000.0).round() as i64,
        }
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    /// Key of a row with the time offset applied; `None` when it does not
    /// normalize to a calendar date.
    pub fn key_of(&self, values: &RowValues) -> Option<i64> {
        values
            .get(&self.column)
            .and_then(|v| self.parse(v))
            .and_then(|key| key.checked_add(self.offset_ms))
            .filter(|&key| is_calendar_key(key))
    }

    pub fn parse(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_key)),
            Value::String(s) => self.parse_str(s.trim()),
            _ => None,
        }
    }

    fn parse_str(&self, s: &str) -> Option<i64> {
        if s.is_empty() {
            return None;
        }
        if let Ok(number) = s.parse::<i64>() {
            return Some(number);
        }
        if let Ok(number) = s.parse::<f64>() {
            return float_key(number);
        }
        if let Some(pattern) = &self.pattern {
            if let Ok(dt) = DateTime::parse_from_str(s, pattern) {
                return Some(dt.timestamp_millis());
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
                return self.localize(naive);
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, pattern) {
                return date.and_hms_opt(0, 0, 0).and_then(|n| self.localize(n));
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.timestamp_millis());
        }
        for format in DATE_TIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return self.localize(naive);
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|n| self.localize(n))
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<i64> {
        match self.timezone {
            Some(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp_millis()),
            None => Some(naive.and_utc().timestamp_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_variants() {
        let parser = KeyParser::new(&TableConfig::default());
        assert_eq!(parser.parse(&json!(1500)), Some(1500));
        assert_eq!(parser.parse(&json!("2500")), Some(2500));
        assert_eq!(parser.parse(&json!("2000-01-01")), Some(946_684_800_000));
        assert_eq!(parser.parse(&json!("2000-01-01T00:00:01Z")), Some(946_684_801_000));
        assert_eq!(parser.parse(&json!("2000-01-01 00:00:02")), Some(946_684_802_000));
        assert_eq!(parser.parse(&json!("not a date")), None);
        assert_eq!(parser.parse(&Value::Null), None);
    }

    #[test]
    fn test_pattern_timezone_and_offset() {
        let config = TableConfig::default()
            .with_date_time_pattern("%d/%m/%Y %H:%M")
            .with_timezone(chrono_tz::Europe::Paris)
            .with_time_offset_hours(1.0);
        let parser = KeyParser::new(&config);
        let values = RowValues::from(vec![json!("01/01/2000 01:00"), json!(1)]);
        // 01:00 in Paris is midnight UTC, plus one hour of offset.
        assert_eq!(parser.key_of(&values), Some(946_684_800_000 + 3_600_000));
    }

    #[test]
    fn test_out_of_range_keys() {
        let parser = KeyParser::new(&TableConfig::default());
        assert_eq!(parser.parse(&json!(1e19)), None);
        assert_eq!(parser.parse(&json!(-1e30)), None);
        assert_eq!(parser.parse(&json!("1e19")), None);
        assert_eq!(parser.parse(&json!(i64::MAX)), Some(i64::MAX));
        assert_eq!(parser.parse(&json!(u64::MAX)), None);
        assert_eq!(parser.parse(&json!(1500.7)), Some(1500));

        let shifted = KeyParser::new(&TableConfig::default().with_time_offset_hours(1.0));
        let row = |v: Value| RowValues::from(vec![v, json!(1)]);
        assert_eq!(shifted.key_of(&row(json!(i64::MAX))), None);
        assert_eq!(shifted.key_of(&row(json!(1e16))), None);
        assert_eq!(shifted.key_of(&row(json!(0))), Some(3_600_000));
    }
}
