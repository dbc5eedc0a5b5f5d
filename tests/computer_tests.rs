use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stock_table::{FnCalculation, Interval, IntervalUnit, Table, TableComputer};

fn table_with_values(values: &[f64]) -> Table {
    let table = Table::new();
    table.add_data(
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| vec![(i as f64) * 1000.0, v]),
    );
    table
}

fn running_sum(table: &Table, alias: &str) -> TableComputer {
    let mut mapping = table.mapping();
    mapping.add_field("value", 1usize, None);
    let computer = table.create_computer(&mapping).unwrap();
    computer.add_output_field(alias).unwrap();
    let alias = alias.to_string();
    computer
        .set_calculation(
            FnCalculation::new(0.0)
                .start_function(|sum: &mut f64| *sum = 0.0)
                .calculation_function(move |row, sum| {
                    *sum += row.get("value");
                    row.set(&alias, *sum);
                }),
        )
        .unwrap();
    computer
}

fn outputs(computer: &TableComputer, alias: &str, interval: Option<Interval>) -> Vec<f64> {
    let mapping = computer.output_mapping(interval);
    (0..mapping.row_count()).map(|i| mapping.get(i, alias)).collect()
}

#[test]
fn test_running_sum_extends_incrementally() {
    let table = table_with_values(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let computer = running_sum(&table, "sum");
    assert_eq!(outputs(&computer, "sum", None), vec![1.0, 3.0, 6.0, 10.0, 15.0]);

    table.add_data(vec![vec![5000.0, 6.0]]);
    assert_eq!(
        outputs(&computer, "sum", None),
        vec![1.0, 3.0, 6.0, 10.0, 15.0, 21.0]
    );

    // An insert in the middle restarts the calculation from the first row.
    table.add_data(vec![vec![500.0, 100.0]]);
    assert_eq!(
        outputs(&computer, "sum", None),
        vec![1.0, 101.0, 103.0, 106.0, 110.0, 115.0, 121.0]
    );
}

#[test]
fn test_computer_runs_on_aggregated_rows() {
    let table = table_with_values(&[1.0, 2.0, 3.0, 4.0]);
    let computer = running_sum(&table, "sum");
    // Two-second buckets keep the last value: 2.0 and 4.0.
    let interval = Some(Interval::new(IntervalUnit::Second, 2));
    assert_eq!(outputs(&computer, "sum", interval), vec![2.0, 6.0]);
    assert_eq!(outputs(&computer, "sum", None), vec![1.0, 3.0, 6.0, 10.0]);
}

#[test]
fn test_missing_calculation_is_reported() {
    let table = table_with_values(&[1.0, 2.0]);
    let computer = table.create_computer(&table.mapping()).unwrap();
    computer.add_output_field("orphan").unwrap();

    let err = table.update(None).unwrap_err();
    assert!(err.to_string().contains("no calculation"));

    // Reads still succeed and leave the output unset.
    assert!(outputs(&computer, "orphan", None).iter().all(|v| v.is_nan()));
}

#[test]
fn test_aliases_are_unique_until_disposed() {
    let table = table_with_values(&[1.0, 2.0, 3.0]);
    let first = running_sum(&table, "sum");
    let column = table.computed_column("sum").unwrap();

    let other = table.create_computer(&table.mapping()).unwrap();
    assert!(other.add_output_field("sum").is_err());

    first.dispose();
    assert_eq!(table.computed_column("sum"), None);
    assert_eq!(other.add_output_field("sum").unwrap(), column);
}

#[test]
fn test_foreign_mapping_is_rejected() {
    let table = Table::new();
    let other = Table::new();
    assert!(table.create_computer(&other.mapping()).is_err());
}

#[test]
fn test_reinit_restarts_from_first_row() {
    let table = table_with_values(&[1.0, 2.0, 3.0]);
    let starts = Arc::new(AtomicUsize::new(0));

    let computer = table.create_computer(&table.mapping()).unwrap();
    computer.add_output_field("index").unwrap();
    computer
        .set_calculation(
            FnCalculation::new(starts.clone())
                .start_function(|starts: &mut Arc<AtomicUsize>| {
                    starts.fetch_add(1, Ordering::SeqCst);
                })
                .calculation_function(|row, _| {
                    let index = row.index() as f64;
                    row.set_at(0, index);
                }),
        )
        .unwrap();

    assert_eq!(outputs(&computer, "index", None), vec![0.0, 1.0, 2.0]);
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    // Reading again does not rerun anything.
    outputs(&computer, "index", None);
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    computer.reinit().unwrap();
    outputs(&computer, "index", None);
    assert_eq!(starts.load(Ordering::SeqCst), 2);
}
