use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stock_table::data_types::{GroupingConfig, IntervalDescriptor};
use stock_table::{
    Grouping, Interval, IntervalUnit, KeyIndexRegistry, OrdinalScale, ScatterScale, Signal, Table,
};

const HOUR: i64 = 3_600_000;
const DAY: f64 = 86_400_000.0;

#[test]
fn test_choose_interval_for_visible_range() {
    let grouping = Grouping::with_default_levels();
    assert_eq!(
        grouping.choose_interval(DAY, None),
        Interval::new(IntervalUnit::Minute, 5)
    );
    assert_eq!(
        grouping.choose_interval(DAY, Some(100.0)),
        Interval::new(IntervalUnit::Minute, 15)
    );
    assert_eq!(
        grouping.choose_interval(DAY * 365.0 * 1000.0, None),
        Interval::new(IntervalUnit::Year, 1)
    );
    assert_eq!(
        grouping.choose_interval(10.0, None),
        Interval::new(IntervalUnit::Millisecond, 1)
    );
}

#[test]
fn test_chosen_interval_grows_with_range() {
    let grouping = Grouping::with_default_levels();
    let mut rng = rand::rng();
    for _ in 0..500 {
        let a = rng.random_range(1.0..DAY * 3650.0);
        let b = rng.random_range(1.0..DAY * 3650.0);
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let fine = grouping.choose_interval(small, None);
        let coarse = grouping.choose_interval(large, None);
        assert!(fine.range() <= coarse.range(), "{} > {}", fine, coarse);
    }
}

#[test]
fn test_level_point_budgets() {
    let mut grouping = Grouping::new();
    grouping.set_levels(&[
        IntervalDescriptor::new(IntervalUnit::Hour, 1),
        IntervalDescriptor::new(IntervalUnit::Minute, 1).with_max_points(10.0),
    ]);
    // One minute at 10 points covers 10 minutes only.
    assert_eq!(
        grouping.choose_interval(20.0 * 60_000.0, None),
        Interval::new(IntervalUnit::Hour, 1)
    );
    assert_eq!(
        grouping.choose_interval(5.0 * 60_000.0, None),
        Interval::new(IntervalUnit::Minute, 1)
    );
    assert_eq!(
        grouping.choose_interval(20.0 * 60_000.0, Some(100.0)),
        Interval::new(IntervalUnit::Minute, 1)
    );
}

#[test]
fn test_set_levels_normalizes_and_notifies() {
    let mut grouping = Grouping::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    grouping.subscribe(move |signal| {
        assert!(signal.contains(Signal::NEEDS_REAPPLICATION));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    grouping.set_levels(&[
        IntervalDescriptor::new(IntervalUnit::Hour, 1),
        IntervalDescriptor::new(IntervalUnit::Minute, 1),
        IntervalDescriptor::new(IntervalUnit::Hour, 1),
    ]);
    let levels: Vec<Interval> = grouping.levels().iter().map(|l| l.interval).collect();
    assert_eq!(
        levels,
        vec![
            Interval::new(IntervalUnit::Minute, 1),
            Interval::new(IntervalUnit::Hour, 1)
        ]
    );

    grouping.set_levels(&[]);
    assert_eq!(grouping.levels().len(), 1);
    assert_eq!(grouping.levels()[0].interval, Interval::default());

    grouping.set_max_visible_points(1.0);
    assert_eq!(grouping.max_visible_points(), 2.0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_grouping_for_selection() {
    let table = Table::new();
    table.add_data((0..10_000).map(|i| vec![i as f64 * 1000.0, 1.0]));
    let mut grouping = Grouping::with_default_levels();

    let all = table.select(0, 9_999_000, None);
    assert_eq!(
        grouping.choose_for_selection(800.0, &all),
        Some(Interval::new(IntervalUnit::Second, 20))
    );
    assert!(grouping.is_grouped());

    let few = table.select(0, 99_000, None);
    assert_eq!(grouping.choose_for_selection(800.0, &few), None);
    assert!(!grouping.is_grouped());
    assert_eq!(
        grouping.current_data_interval(),
        Interval::new(IntervalUnit::Second, 1)
    );

    grouping.set_forced(true);
    assert!(grouping.choose_for_selection(800.0, &few).is_some());

    grouping.set_forced(false).set_enabled(false);
    assert_eq!(grouping.choose_for_selection(800.0, &all), None);
}

#[test]
fn test_grouping_over_open_bounds_selection() {
    let table = Table::new();
    table.add_data((0..10_000).map(|i| vec![i as f64 * 1000.0, 1.0]));
    let mut grouping = Grouping::with_default_levels();

    let everything = table.select(i64::MIN, i64::MAX, None);
    assert_eq!(everything.count(), 10_000);
    let interval = grouping.choose_for_selection(800.0, &everything);
    assert_eq!(interval, grouping.levels().last().map(|l| l.interval));
}

#[test]
fn test_grouping_resets_when_data_shrinks() {
    let table = Table::new();
    table.add_data((0..10_000).map(|i| vec![i as f64 * 1000.0, 1.0]));
    let mut grouping = Grouping::with_default_levels();
    assert!(grouping
        .choose_for_selection(800.0, &table.select(0, 9_999_000, None))
        .is_some());

    // A single row leaves no key distance to estimate from.
    let shrunk = Table::new();
    shrunk.add_data(vec![vec![5_000.0, 1.0]]);
    let single = shrunk.select(i64::MIN, i64::MAX, None);
    assert_eq!(single.count(), 1);
    assert_eq!(grouping.choose_for_selection(800.0, &single), None);
    assert!(!grouping.is_grouped());
    assert_eq!(grouping.current_data_interval(), Interval::default());
}

#[test]
fn test_grouping_from_config() {
    let config =
        GroupingConfig::from_json(r#"{"maxVisiblePoints": 50, "minPixPerPoint": 0.01}"#).unwrap();
    let grouping = Grouping::from_config(&config);
    assert_eq!(grouping.max_visible_points(), 50.0);
    assert_eq!(grouping.min_pix_per_point(), Some(0.1));
    assert_eq!(grouping.levels().len(), 27);
}

#[test]
fn test_scatter_ticks() {
    let mut scale = ScatterScale::new();
    scale.set_full_range(0, 6 * HOUR);
    let ticks = scale.ticks();

    assert_eq!(scale.minor_interval(), Interval::new(IntervalUnit::Hour, 1));
    assert_eq!(scale.major_interval(), Interval::new(IntervalUnit::Hour, 3));
    let keys: Vec<i64> = ticks.iter().map(|t| t.key).collect();
    assert_eq!(keys, (0..=6).map(|h| h * HOUR).collect::<Vec<_>>());
    let majors: Vec<i64> = ticks.iter().filter(|t| t.major).map(|t| t.key).collect();
    assert_eq!(majors, vec![0, 3 * HOUR, 6 * HOUR]);
    assert_eq!(scale.format_tick(3 * HOUR), "03:00");
}

#[test]
fn test_scatter_transform_roundtrip() {
    let mut scale = ScatterScale::new();
    scale.set_full_range(0, 10_000);
    scale.set_current_range(1_000, 3_000);
    assert_eq!(scale.transform(2_000), 0.5);
    assert_eq!(scale.inverse_transform(0.25), Some(1_500));
    assert_eq!(scale.full_range(), Some((0, 10_000)));
}

#[test]
fn test_scatter_full_key_range() {
    let mut scale = ScatterScale::new();
    scale.set_full_range(i64::MIN, i64::MAX);
    assert_eq!(scale.transform(0), 0.5);
    assert_eq!(scale.transform(i64::MAX), 1.0);
    assert_eq!(scale.inverse_transform(0.0), Some(i64::MIN));
    assert_eq!(scale.inverse_transform(1.0), Some(i64::MAX));
    assert!(scale.choose_interval(None).is_some());
}

#[test]
fn test_scatter_explicit_ticks() {
    let mut scale = ScatterScale::new();
    scale.set_full_range(0, 100);
    scale.set_explicit_ticks(Some(vec![150, 50, 10]));
    let keys: Vec<i64> = scale.ticks().iter().map(|t| t.key).collect();
    assert_eq!(keys, vec![10, 50]);

    scale.set_explicit_ticks(None);
    assert!(!scale.ticks().is_empty());
}

#[test]
fn test_scatter_scale_signals() {
    let mut scale = ScatterScale::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    scale.subscribe(move |signal| {
        counter.fetch_or(signal.0 as usize, Ordering::SeqCst);
    });
    scale.set_full_range(0, 10);
    scale.set_current_range(2, 5);
    let bits = seen.load(Ordering::SeqCst) as u32;
    assert_eq!(
        bits,
        (Signal::NEED_UPDATE_FULL_RANGE_ITEMS | Signal::NEED_UPDATE_TICK_DEPENDENT).0
    );
}

#[test]
fn test_ordinal_scale_skips_gaps() {
    let keys = vec![0, HOUR, 2 * HOUR, 10 * HOUR, 11 * HOUR];
    let mut scale = OrdinalScale::new();
    scale.set_registry(KeyIndexRegistry::from_keys(keys));

    assert_eq!(scale.transform(10 * HOUR), 0.75);
    assert_eq!(scale.inverse_transform(0.5), Some(2 * HOUR));
    assert_eq!(scale.align_key(9 * HOUR), Some(10 * HOUR));

    let ticks = scale.ticks();
    assert_eq!(scale.minor_interval(), Interval::new(IntervalUnit::Hour, 3));
    let summary: Vec<(i64, bool, Option<usize>)> =
        ticks.iter().map(|t| (t.key, t.major, t.index)).collect();
    assert_eq!(summary, vec![(0, true, Some(0)), (10 * HOUR, false, Some(3))]);
}

#[test]
fn test_registry_with_distant_keys() {
    let registry = KeyIndexRegistry::from_keys(vec![i64::MIN, 0, i64::MAX]);
    assert_eq!(registry.index_by_key(0), 1.0);
    assert_eq!(registry.index_by_key(i64::MAX), 2.0);
    assert!((registry.index_by_key(i64::MAX / 2) - 1.5).abs() < 1e-9);
    assert_eq!(registry.key_by_index(2.0), Some(i64::MAX));

    let single = KeyIndexRegistry::from_keys(vec![i64::MIN]);
    assert_eq!(single.index_by_key(i64::MAX), u64::MAX as f64);
}

#[test]
fn test_registry_from_tables() {
    let a = Table::new();
    a.add_data(vec![vec![0.0, 1.0], vec![20.0, 1.0]]);
    let b = Table::new();
    b.add_data(vec![vec![10.0, 1.0], vec![20.0, 1.0]]);

    let registry = KeyIndexRegistry::from_tables(&[&a, &b], None);
    assert_eq!(registry.keys(), &[0, 10, 20]);
    assert_eq!(registry.index_by_key(15), 1.5);

    let mut scale = OrdinalScale::new();
    scale.set_registry(registry);
    scale.set_current_range(10, 20);
    assert_eq!(scale.index_range(), (1.0, 2.0));
    assert_eq!(scale.current_range(), Some((10, 20)));
}
