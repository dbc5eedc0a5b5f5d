#![cfg(feature = "polars")]

use crate::data_types::{ColumnRef, RowValues};
use crate::table::{AddReport, Table};
use eyre::{Result, WrapErr};
use polars::prelude::*;
use serde_json::{Map, Number, Value};

fn key_values(series: &Series) -> Result<Vec<Value>> {
    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|s| s.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect(),
        DataType::Date | DataType::Datetime(_, _) => {
            let millis = series
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            millis
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::from))
                .collect()
        }
        _ => number_values(series)?,
    };
    Ok(values)
}

fn number_values(series: &Series) -> Result<Vec<Value>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.and_then(Number::from_f64).map_or(Value::Null, Value::Number))
        .collect())
}

impl Table {
    /// Ingests a DataFrame as object rows.
    ///
    /// The key column is stored under the table's key column; temporal keys become
    /// epoch milliseconds, string keys go through the table's date parsing.
    /// Value columns keep their names and are cast to floats, nulls reading as NaN.
    pub fn add_dataframe(
        &self,
        df: &DataFrame,
        key_column: &str,
        value_columns: &[&str],
    ) -> Result<AddReport> {
        let key_name = match self.key_column() {
            ColumnRef::Name(name) => name,
            ColumnRef::Index(index) => index.to_string(),
        };
        let keys = key_values(
            df.column(key_column)
                .wrap_err_with(|| format!("missing key column '{}'", key_column))?
                .as_materialized_series(),
        )?;

        let mut columns = Vec::with_capacity(value_columns.len());
        for name in value_columns {
            let column = df
                .column(name)
                .wrap_err_with(|| format!("missing value column '{}'", name))?;
            columns.push((*name, number_values(column.as_materialized_series())?));
        }

        let rows: Vec<RowValues> = keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| {
                let mut map = Map::with_capacity(columns.len() + 1);
                for (name, values) in &columns {
                    map.insert(name.to_string(), values[i].clone());
                }
                map.insert(key_name.clone(), key);
                RowValues::Object(map)
            })
            .collect();
        Ok(self.add_data(rows))
    }
}
