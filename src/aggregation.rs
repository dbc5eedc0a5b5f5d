use crate::data_types::{AggregatedRow, ColumnRef, DataRow, Interval, TableRow};
use crate::utils::IntervalGenerator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;

/// How the raw values of one bucket collapse into a single value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reducer {
    First,
    #[default]
    Last,
    Min,
    Max,
    Sum,
    Average,
    WeightedAverage,
}

impl Reducer {
    /// Resolves reducer names and their chart aliases. Unknown names fall back to `Last`.
    pub fn from_name(name: &str) -> Reducer {
        match name.trim().to_ascii_lowercase().as_str() {
            "first" | "open" => Reducer::First,
            "last" | "close" => Reducer::Last,
            "min" | "minimum" | "low" | "lowest" => Reducer::Min,
            "max" | "maximum" | "high" | "highest" => Reducer::Max,
            "sum" | "add" => Reducer::Sum,
            "average" | "avg" => Reducer::Average,
            "weighted-average" | "weightedaverage" | "weighted_average" | "wavg" | "weighted" => {
                Reducer::WeightedAverage
            }
            _ => Reducer::Last,
        }
    }

    /// Reduces a chronologically ordered sequence. NaN values are skipped;
    /// the result is NaN when no value remains.
    pub fn reduce<I>(self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let mut iter = values.into_iter().filter(|v| !v.is_nan());
        match self {
            Reducer::First => iter.next().unwrap_or(f64::NAN),
            Reducer::Last => iter.last().unwrap_or(f64::NAN),
            Reducer::Min => iter.fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc }),
            Reducer::Max => iter.fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc }),
            Reducer::Sum => iter.fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc + v }),
            Reducer::Average | Reducer::WeightedAverage => {
                let (sum, count) = iter.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            }
        }
    }

    /// Σ v·w / Σ w over pairs where both sides are finite.
    pub fn reduce_weighted<I>(values: I) -> f64
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (num, den) = values
            .into_iter()
            .filter(|(v, w)| v.is_finite() && w.is_finite())
            .fold((0.0, 0.0), |(n, d), (v, w)| (n + v * w, d + w));
        if den == 0.0 {
            f64::NAN
        } else {
            num / den
        }
    }
}

impl FromStr for Reducer {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Reducer::from_name(s))
    }
}

/// A registered aggregated column: where it reads and how it reduces.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregateColumn {
    pub source: ColumnRef,
    pub reducer: Reducer,
    pub weights: Option<ColumnRef>,
}

impl AggregateColumn {
    pub fn new(source: ColumnRef, reducer: Reducer) -> Self {
        Self {
            source,
            reducer,
            weights: None,
        }
    }

    pub fn weighted(source: ColumnRef, weights: ColumnRef) -> Self {
        Self {
            source,
            reducer: Reducer::WeightedAverage,
            weights: Some(weights),
        }
    }

    /// Pure reduction over the raw rows of one bucket.
    pub fn reduce_rows(&self, rows: &[DataRow]) -> f64 {
        match (&self.reducer, &self.weights) {
            (Reducer::WeightedAverage, Some(weights)) => Reducer::reduce_weighted(
                rows.iter()
                    .map(|r| (r.values.number(&self.source), r.values.number(weights))),
            ),
            (reducer, _) => reducer.reduce(rows.iter().map(|r| r.values.number(&self.source))),
        }
    }
}

/// Splits sorted rows into calendar buckets of `interval`.
///
/// Returns the bucket start key with the index range of its rows. Empty
/// buckets are never produced; long gaps are skipped by re-aligning on the
/// next row instead of walking every empty interval.
pub fn bucket_ranges<V>(rows: &[TableRow<V>], interval: &Interval) -> Vec<(i64, Range<usize>)> {
    let n = rows.len();
    let mut buckets = Vec::new();
    if n == 0 {
        return buckets;
    }

    let gen = IntervalGenerator::new(*interval);
    let mut start = 0;

    while start < n {
        let key = rows[start].key;
        let bucket = gen
            .align(key)
            .and_then(|aligned| Some((aligned, gen.shift(aligned, 1)?)))
            .filter(|&(aligned, next)| aligned <= key && key < next);
        // Keys the calendar cannot bucket form a bucket of their own.
        let (bucket_key, next_key) = match bucket {
            Some(bucket) => bucket,
            None => (key, key.saturating_add(1)),
        };
        let len = rows[start..].partition_point(|r| r.key < next_key);
        let end = start + len.max(1);
        buckets.push((bucket_key, start..end));
        start = end;
    }

    buckets
}

/// Builds aggregated rows for `rows` in parallel, one per non-empty bucket.
pub fn aggregate_rows(
    rows: &[DataRow],
    interval: &Interval,
    columns: &[AggregateColumn],
) -> Vec<AggregatedRow> {
    bucket_ranges(rows, interval)
        .into_par_iter()
        .map(|(key, range)| {
            let chunk = &rows[range];
            let values = columns.iter().map(|c| c.reduce_rows(chunk)).collect();
            TableRow::new(key, values, 0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::IntervalUnit;

    fn rows(points: &[(i64, f64)]) -> Vec<DataRow> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(k, v))| TableRow::new(k, vec![k as f64, v].into(), i as u64))
            .collect()
    }

    #[test]
    fn test_reducers_skip_nan() {
        let values = [f64::NAN, 3.0, 1.0, f64::NAN, 2.0, f64::NAN];
        assert_eq!(Reducer::First.reduce(values), 3.0);
        assert_eq!(Reducer::Last.reduce(values), 2.0);
        assert_eq!(Reducer::Min.reduce(values), 1.0);
        assert_eq!(Reducer::Max.reduce(values), 3.0);
        assert_eq!(Reducer::Sum.reduce(values), 6.0);
        assert_eq!(Reducer::Average.reduce(values), 2.0);
        assert!(Reducer::Sum.reduce([f64::NAN]).is_nan());
    }

    #[test]
    fn test_reducer_aliases() {
        assert_eq!(Reducer::from_name("open"), Reducer::First);
        assert_eq!(Reducer::from_name("HIGH"), Reducer::Max);
        assert_eq!(Reducer::from_name("lowest"), Reducer::Min);
        assert_eq!(Reducer::from_name("wavg"), Reducer::WeightedAverage);
        assert_eq!(Reducer::from_name("whatever"), Reducer::Last);
    }

    #[test]
    fn test_weighted_average() {
        let v = Reducer::reduce_weighted([(10.0, 1.0), (20.0, 3.0), (f64::NAN, 5.0)]);
        assert_eq!(v, 17.5);
    }

    #[test]
    fn test_bucket_ranges_skip_gaps() {
        let r = rows(&[(0, 1.0), (400, 2.0), (1000, 3.0), (5_000_000, 4.0), (5_000_100, 5.0)]);
        let b = bucket_ranges(&r, &Interval::new(IntervalUnit::Second, 1));
        assert_eq!(b, vec![(0, 0..2), (1000, 2..3), (5_000_000, 3..5)]);
    }

    #[test]
    fn test_bucket_ranges_outside_calendar() {
        let far = 10_000_000_000_000_000;
        let r = rows(&[(0, 1.0), (1000, 2.0), (far, 3.0), (far, 4.0), (i64::MAX, 5.0)]);
        let b = bucket_ranges(&r, &Interval::new(IntervalUnit::Month, 1));
        assert_eq!(b, vec![(0, 0..2), (far, 2..4), (i64::MAX, 4..5)]);
    }
}
