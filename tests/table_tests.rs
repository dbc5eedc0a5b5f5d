use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stock_table::{AddOptions, Interval, IntervalUnit, SearchMode, Signal, Table, TableConfig};

fn value_table(rows: &[(i64, f64)]) -> Table {
    let table = Table::new();
    table.add_data(rows.iter().map(|&(k, v)| vec![k as f64, v]));
    table
}

fn values(table: &Table) -> Vec<f64> {
    let mut mapping = table.mapping();
    mapping.add_field("value", 1usize, None);
    (0..mapping.row_count()).map(|i| mapping.get(i, "value")).collect()
}

#[test]
fn test_unordered_batches_end_sorted() {
    let mut rng = rand::rng();
    let mut keys: Vec<i64> = (0..500).map(|i| i * 1000).collect();
    keys.shuffle(&mut rng);

    let table = Table::new();
    let mut rest = keys.as_slice();
    while !rest.is_empty() {
        let take = rng.random_range(1..=rest.len().min(60));
        let (batch, tail) = rest.split_at(take);
        table.add_data(batch.iter().map(|&k| vec![k as f64, k as f64 / 10.0]));
        rest = tail;
    }

    let mut expected = keys.clone();
    expected.sort_unstable();
    assert_eq!(table.keys(), expected);
    assert_eq!(table.len(), 500);

    table.with_rows(|rows| {
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.prev, i.checked_sub(1));
            assert_eq!(row.next, (i + 1 < rows.len()).then_some(i + 1));
        }
    });
}

#[test]
fn test_streaming_appends_match_bulk_load() {
    let rows: Vec<(i64, f64)> = (0..200).map(|i| (i * 60_000, (i % 17) as f64)).collect();

    let bulk = value_table(&rows);
    let streamed = Table::new();
    for chunk in rows.chunks(7) {
        streamed.add_data(chunk.iter().map(|&(k, v)| vec![k as f64, v]));
    }

    assert_eq!(bulk.keys(), streamed.keys());
    assert_eq!(values(&bulk), values(&streamed));
}

#[test]
fn test_duplicate_keys_keep_last_value() {
    let table = value_table(&[(1000, 10.0), (1000, 20.0)]);
    assert_eq!(table.len(), 1);
    assert_eq!(values(&table), vec![20.0]);

    table.add_data(vec![vec![1000.0, 30.0]]);
    assert_eq!(table.len(), 1);
    assert_eq!(values(&table), vec![30.0]);

    table.add_data(vec![vec![3000.0, 1.0], vec![2000.0, 2.0], vec![3000.0, 3.0]]);
    assert_eq!(table.keys(), vec![1000, 2000, 3000]);
    assert_eq!(values(&table), vec![30.0, 2.0, 3.0]);
}

#[test]
fn test_duplicates_kept_when_disabled() {
    let table = Table::with_config(TableConfig::default().with_remove_duplicates(false));
    table.add_data(vec![vec![1000.0, 10.0], vec![1000.0, 20.0]]);
    assert_eq!(table.len(), 2);
    assert_eq!(values(&table), vec![10.0, 20.0]);

    let dedup = Table::new();
    dedup.add_data_with(
        vec![vec![5.0, 1.0], vec![5.0, 2.0]],
        AddOptions::default().with_remove_duplicates(false),
    );
    assert_eq!(dedup.len(), 2);
}

#[test]
fn test_transaction_commit_notifies_once() {
    let table = Table::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    table.subscribe(move |signal| {
        assert!(signal.contains(Signal::DATA_CHANGED));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    table.start_transaction();
    table.add_data(vec![vec![1.0, 1.0]]);
    table.add_data(vec![vec![2.0, 2.0]]);
    table.remove(Some(1), Some(1));
    assert_eq!(table.len(), 0);
    assert_eq!(table.pending_rows(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    table.commit();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(table.keys(), vec![2]);

    table.add_data(vec![vec![3.0, 3.0]]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_rollback_discards_batch() {
    let table = value_table(&[(1, 1.0), (2, 2.0)]);
    table.start_transaction();
    table.add_data(vec![vec![3.0, 3.0]]);
    table.remove(None, Some(1));
    table.rollback();

    assert!(!table.in_transaction());
    assert_eq!(table.pending_rows(), 0);
    table.commit();
    assert_eq!(table.keys(), vec![1, 2]);
}

#[test]
fn test_remove_ranges() {
    let rows: Vec<(i64, f64)> = (0..10).map(|i| (i * 1000, i as f64)).collect();
    let table = value_table(&rows);

    assert_eq!(table.remove(Some(2000), Some(4000)), 3);
    assert_eq!(table.len(), 7);
    assert_eq!(table.remove(None, Some(1000)), 2);
    assert_eq!(table.keys(), vec![5000, 6000, 7000, 8000, 9000]);
    assert_eq!(table.remove(Some(8500), None), 1);
    assert_eq!(table.keys(), vec![5000, 6000, 7000, 8000]);
    assert_eq!(table.remove(Some(100), Some(200)), 0);
}

#[test]
fn test_remove_first_keeps_window() {
    let table = Table::new();
    for i in 0..20 {
        table.add_data_with(
            vec![vec![i as f64 * 10.0, i as f64]],
            AddOptions::default().with_remove_from_start(if i >= 5 { 1 } else { 0 }),
        );
    }
    assert_eq!(table.len(), 5);
    assert_eq!(table.keys(), vec![150, 160, 170, 180, 190]);

    assert_eq!(table.remove_first(2), 2);
    assert_eq!(table.keys(), vec![170, 180, 190]);
    assert_eq!(table.remove_first(10), 3);
    assert!(table.is_empty());
}

#[test]
fn test_unparseable_keys_are_dropped() {
    let table = Table::new();
    let report = table
        .add_json(r#"[["not a date", 1], [1000, 2], [null, 3]]"#)
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.dropped, 2);
    assert_eq!(table.dropped_rows(), 2);
    assert_eq!(table.keys(), vec![1000]);
}

#[test]
fn test_keys_outside_calendar_are_dropped() {
    let table = Table::new();
    let report = table.add_data(vec![
        vec![1e16, 5.0],
        vec![0.0, 1.0],
        vec![-1e16, 2.0],
        vec![1e19, 3.0],
        vec![1e30, 4.0],
    ]);
    assert_eq!(report.added, 1);
    assert_eq!(report.dropped, 4);
    assert_eq!(table.dropped_rows(), 4);

    let mut monthly = table
        .mapping()
        .with_interval(Some(Interval::new(IntervalUnit::Month, 1)));
    monthly.add_field("value", 1usize, None);
    assert_eq!(monthly.row_count(), 1);
    assert_eq!(monthly.get(0, "value"), 1.0);
}

#[test]
fn test_time_offset_never_overflows_keys() {
    let table = Table::with_config(TableConfig::default().with_time_offset_hours(1.0));
    let report = table
        .add_json(&format!("[[{}, 1], [1e19, 2], [0, 3]]", i64::MAX))
        .unwrap();
    assert_eq!(report.dropped, 2);
    assert_eq!(table.keys(), vec![3_600_000]);
}

#[test]
fn test_json_objects_with_dates() {
    let table = Table::with_config(TableConfig::default().with_key_column("date"));
    table
        .add_json(r#"[{"date": "2024-01-02", "close": 10}, {"date": "2024-01-01", "close": 5}]"#)
        .unwrap();
    assert_eq!(table.keys(), vec![1_704_067_200_000, 1_704_153_600_000]);

    let mut mapping = table.mapping();
    mapping.add_field("close", "close", None);
    assert_eq!(mapping.get(0, "close"), 5.0);
    assert_eq!(mapping.get(1, "close"), 10.0);

    assert!(table.add_json("{}").is_err());
    assert!(table.add_json("[1, 2]").is_err());
}

#[test]
fn test_search_modes() {
    let table = value_table(&[(0, 0.0), (10, 1.0), (20, 2.0)]);
    let key = |mode, at| table.search(at, mode).map(|r| r.key);

    assert_eq!(key(SearchMode::Exact, 10), Some(10));
    assert_eq!(key(SearchMode::Exact, 15), None);
    assert_eq!(key(SearchMode::ExactOrPrev, 15), Some(10));
    assert_eq!(key(SearchMode::ExactOrNext, 15), Some(20));
    assert_eq!(key(SearchMode::Nearest, 15), Some(10));
    assert_eq!(key(SearchMode::Nearest, 16), Some(20));
    assert_eq!(key(SearchMode::ExactOrPrev, -5), None);
    assert_eq!(key(SearchMode::ExactOrNext, 25), None);
    assert_eq!(key(SearchMode::Nearest, 100), Some(20));
}

#[test]
fn test_select_reports_neighbours() {
    let table = value_table(&[(0, 0.0), (10, 1.0), (25, 2.0), (30, 3.0)]);
    let selection = table.select(5, 26, None);
    assert_eq!(selection.pre_first_index, Some(0));
    assert_eq!(selection.first_index, Some(1));
    assert_eq!(selection.last_index, Some(2));
    assert_eq!(selection.post_last_index, Some(3));
    assert_eq!(selection.count(), 2);
    assert_eq!(selection.min_distance, 5.0);

    let empty = table.select(11, 20, None);
    assert!(empty.is_empty());
    assert_eq!(empty.pre_first_index, Some(1));
    assert_eq!(empty.post_last_index, Some(2));
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let table = Table::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let id = table.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    table.add_data(vec![vec![1.0, 1.0]]);
    assert!(table.unsubscribe(id));
    table.add_data(vec![vec![2.0, 1.0]]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!table.unsubscribe(id));
}
