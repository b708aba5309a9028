//! Conversion of AGS groups into typed Polars DataFrames.

use super::AgsGroup;
use crate::constants::{AGS3_DATE_FORMAT, DATE_TYPE, ISO_DATE_FORMAT, NUMERIC_TYPE_SUFFIXES};
use crate::error::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, warn};

/// Inferred storage type of an AGS column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Date,
    Text,
}

/// Convert a group into a DataFrame, one column per heading
pub fn group_to_dataframe(group: &AgsGroup) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(group.headings.len());

    for (index, heading) in group.headings.iter().enumerate() {
        let values: Vec<&str> = group
            .rows
            .iter()
            .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
            .collect();

        let kind = infer_column_kind(heading, &values, group.type_of(index));
        let series = match kind {
            ColumnKind::Float => Series::new(heading.as_str().into(), parse_floats(&values)),
            ColumnKind::Date => Series::new(heading.as_str().into(), normalize_dates(&values)),
            ColumnKind::Text => Series::new(heading.as_str().into(), text_values(&values)),
        };
        columns.push(Column::from(series));
    }

    debug!(
        "Converted group {} to {} rows x {} columns",
        group.name,
        group.row_count(),
        columns.len()
    );

    Ok(DataFrame::new(columns)?)
}

/// Decide how a column is stored.
///
/// Identifier headings stay text. AGS4 TYPE declarations are honoured when the
/// values agree with them; otherwise the values decide.
pub fn infer_column_kind(heading: &str, values: &[&str], ags_type: Option<&str>) -> ColumnKind {
    if is_identifier_heading(heading) {
        return ColumnKind::Text;
    }

    let non_empty: Vec<&str> = values.iter().copied().filter(|v| !v.is_empty()).collect();
    if non_empty.is_empty() {
        return ColumnKind::Text;
    }

    let all_numeric = non_empty.iter().all(|v| parse_float(v).is_some());
    let all_dates = non_empty.iter().all(|v| parse_date(v).is_some());

    match ags_type {
        Some(t) if t == DATE_TYPE => {
            if all_dates {
                ColumnKind::Date
            } else {
                ColumnKind::Text
            }
        }
        Some(t) if is_numeric_type(t) => {
            if all_numeric {
                ColumnKind::Float
            } else {
                warn!(
                    "Column {} declared as {} holds non-numeric values, keeping as text",
                    heading, t
                );
                ColumnKind::Text
            }
        }
        Some(_) => ColumnKind::Text,
        None if all_numeric => ColumnKind::Float,
        None if all_dates => ColumnKind::Date,
        None => ColumnKind::Text,
    }
}

fn is_identifier_heading(heading: &str) -> bool {
    heading.ends_with("_ID") || heading.ends_with("_REF")
}

fn is_numeric_type(ags_type: &str) -> bool {
    NUMERIC_TYPE_SUFFIXES.iter().any(|suffix| {
        ags_type
            .strip_suffix(suffix)
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    })
}

fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, AGS3_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, ISO_DATE_FORMAT))
        .ok()
}

fn parse_floats(values: &[&str]) -> Vec<Option<f64>> {
    values.iter().map(|v| parse_float(v)).collect()
}

fn normalize_dates(values: &[&str]) -> Vec<Option<String>> {
    values
        .iter()
        .map(|v| parse_date(v).map(|d| d.format(ISO_DATE_FORMAT).to_string()))
        .collect()
}

fn text_values(values: &[&str]) -> Vec<Option<String>> {
    values
        .iter()
        .map(|v| (!v.is_empty()).then(|| v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> AgsGroup {
        AgsGroup {
            name: "HOLE".to_string(),
            headings: vec![
                "HOLE_ID".to_string(),
                "HOLE_GL".to_string(),
                "HOLE_STAR".to_string(),
                "HOLE_REM".to_string(),
            ],
            units: vec![],
            types: vec![],
            rows: vec![
                vec![
                    "1".to_string(),
                    "4.50".to_string(),
                    "12/03/2015".to_string(),
                    "".to_string(),
                ],
                vec![
                    "2".to_string(),
                    "".to_string(),
                    "14/03/2015".to_string(),
                    "Abandoned".to_string(),
                ],
            ],
        }
    }

    #[test]
    fn test_group_to_dataframe_types() {
        let df = group_to_dataframe(&group()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("HOLE_ID").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("HOLE_GL").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("HOLE_STAR").unwrap().dtype(), &DataType::String);

        let gl = df.column("HOLE_GL").unwrap().as_materialized_series().f64().unwrap();
        assert_eq!(gl.get(0), Some(4.5));
        assert_eq!(gl.get(1), None);

        let star = df.column("HOLE_STAR").unwrap().as_materialized_series().str().unwrap();
        assert_eq!(star.get(0), Some("2015-03-12"));

        let rem = df.column("HOLE_REM").unwrap().as_materialized_series().str().unwrap();
        assert_eq!(rem.get(0), None);
        assert_eq!(rem.get(1), Some("Abandoned"));
    }

    #[test]
    fn test_identifier_columns_stay_text() {
        assert_eq!(infer_column_kind("HOLE_ID", &["1", "2"], None), ColumnKind::Text);
        assert_eq!(infer_column_kind("SAMP_REF", &["10"], None), ColumnKind::Text);
        assert_eq!(infer_column_kind("ISPT_NVAL", &["10", "50"], None), ColumnKind::Float);
    }

    #[test]
    fn test_ags4_types_are_honoured() {
        assert_eq!(infer_column_kind("LOCA_GL", &["1.00"], Some("2DP")), ColumnKind::Float);
        assert_eq!(infer_column_kind("ISPT_NVAL", &["12"], Some("0DP")), ColumnKind::Float);
        assert_eq!(infer_column_kind("LOCA_TYPE", &["12"], Some("PA")), ColumnKind::Text);
        assert_eq!(infer_column_kind("MOIS", &[">5"], Some("2SF")), ColumnKind::Text);
        assert_eq!(
            infer_column_kind("LOCA_STAR", &["2020-01-31"], Some("DT")),
            ColumnKind::Date
        );
        assert_eq!(
            infer_column_kind("LOCA_STAR", &["2020-01-31T10:00"], Some("DT")),
            ColumnKind::Text
        );
    }

    #[test]
    fn test_empty_and_non_finite_columns() {
        assert_eq!(infer_column_kind("HOLE_REM", &["", ""], None), ColumnKind::Text);
        assert_eq!(infer_column_kind("HOLE_REM", &["NaN", "inf"], None), ColumnKind::Text);
    }
}
