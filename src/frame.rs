//! DataFrame helpers shared by the database, geospatial and export stages.

use crate::error::{AgsError, Result};
use polars::prelude::*;
use serde_json::{Map, Number, Value};

/// Geometry-less table row as a JSON object, column order preserved
pub type Record = Map<String, Value>;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

fn series<'a>(df: &'a DataFrame, table: &str, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| AgsError::column_not_found(table, name))
}

/// Column values as strings, numbers rendered through a cast
pub fn string_values(df: &DataFrame, table: &str, name: &str) -> Result<Vec<Option<String>>> {
    let series = series(df, table, name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Column values as floats; unparseable text becomes null
pub fn float_values(df: &DataFrame, table: &str, name: &str) -> Result<Vec<Option<f64>>> {
    let series = series(df, table, name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Float values of an optional column, all null when absent
pub fn optional_float_values(
    df: &DataFrame,
    table: &str,
    name: Option<&str>,
) -> Result<Vec<Option<f64>>> {
    match name {
        Some(name) if has_column(df, name) => float_values(df, table, name),
        _ => Ok(vec![None; df.height()]),
    }
}

pub fn string_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::from(Series::new(name.into(), values))
}

/// Build a frame from leading standard columns followed by the raw columns
pub fn prepend_columns(leading: Vec<Column>, raw: &DataFrame) -> Result<DataFrame> {
    let mut columns = leading;
    columns.extend(raw.get_columns().iter().cloned());
    Ok(DataFrame::new(columns)?)
}

/// Replace the values of a string column
pub fn replace_string_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<String>>,
) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// One key per row, equal keys meaning equal rows
pub fn row_keys(df: &DataFrame) -> Result<Vec<String>> {
    let mut keys = vec![String::new(); df.height()];
    for column in df.get_columns() {
        let values = column
            .as_materialized_series()
            .cast(&DataType::String)?;
        for (key, value) in keys.iter_mut().zip(values.str()?.into_iter()) {
            key.push_str(column.name().as_str());
            key.push('=');
            match value {
                Some(v) => {
                    key.push('"');
                    key.push_str(v);
                    key.push('"');
                }
                None => key.push_str("null"),
            }
            key.push('\u{1f}');
        }
    }
    Ok(keys)
}

pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(df.filter(&mask)?)
}

/// Drop rows that repeat an earlier row exactly, keeping first occurrences
pub fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut seen = std::collections::HashSet::new();
    let keep: Vec<bool> = row_keys(df)?
        .into_iter()
        .map(|key| seen.insert(key))
        .collect();
    if keep.iter().all(|k| *k) {
        return Ok(df.clone());
    }
    filter_rows(df, &keep)
}

/// Keep the first row for each value of `name`
pub fn drop_duplicate_keys(df: &DataFrame, table: &str, name: &str) -> Result<DataFrame> {
    let mut seen = std::collections::HashSet::new();
    let keep: Vec<bool> = string_values(df, table, name)?
        .into_iter()
        .map(|key| seen.insert(key))
        .collect();
    if keep.iter().all(|k| *k) {
        return Ok(df.clone());
    }
    filter_rows(df, &keep)
}

/// Union frames by column name; missing columns are filled with nulls
pub fn concat_diagonal(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut frames = frames;
    if frames.len() == 1 {
        return Ok(frames.remove(0));
    }
    let lazy_frames: Vec<LazyFrame> = frames.into_iter().map(|df| df.lazy()).collect();
    let args = UnionArgs {
        to_supertypes: true,
        ..Default::default()
    };
    Ok(concat_lf_diagonal(lazy_frames, args)?.collect()?)
}

fn json_values(series: &Series) -> Result<Vec<Value>> {
    let values = match series.dtype() {
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null))
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            .collect(),
        dtype if dtype.is_integer() => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null))
            .collect(),
    };
    Ok(values)
}

/// Rows as JSON objects, skipping the named columns
pub fn to_records(df: &DataFrame, skip: &[&str]) -> Result<Vec<Record>> {
    let mut records = vec![Record::new(); df.height()];
    for column in df.get_columns() {
        let name = column.name().as_str();
        if skip.contains(&name) {
            continue;
        }
        let values = json_values(column.as_materialized_series())?;
        for (record, value) in records.iter_mut().zip(values) {
            record.insert(name.to_string(), value);
        }
    }
    Ok(records)
}
