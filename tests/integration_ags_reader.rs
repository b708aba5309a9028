//! Integration tests for reading AGS files into typed tables

use ags_processor::ags::{AgsVersion, group_to_dataframe, read_ags_file};
use polars::prelude::DataType;
use std::fs;
use tempfile::TempDir;

/// AGS3 delivery with wrapped headings, units and a continuation line
const AGS3_DELIVERY: &str = concat!(
    "\"**PROJ\"\r\n",
    "\"*PROJ_ID\",\"*PROJ_NAME\",\"*PROJ_LOC\"\r\n",
    "\"<UNITS>\",\"\",\"\"\r\n",
    "\"21/0043\",\"Tseung Kwan O\",\"Site A\"\r\n",
    "\r\n",
    "\"**HOLE\"\r\n",
    "\"*HOLE_ID\",\"*HOLE_TYPE\",\"*HOLE_NATE\",\"*HOLE_NATN\",\r\n",
    "\"*HOLE_GL\",\"*HOLE_FDEP\",\"*HOLE_STAR\",\"*HOLE_REM\"\r\n",
    "\"<UNITS>\",\"\",\"m\",\"m\",\"mPD\",\"m\",\"dd/mm/yyyy\",\"\"\r\n",
    "\"DH1\",\"RC\",\"843210.12\",\"817654.32\",\"6.52\",\"30.15\",\"05/07/2021\",\"Artesian\"\r\n",
    "\"<CONT>\",\"\",\"\",\"\",\"\",\"\",\"\",\"water at 2.1m\"\r\n",
    "\"DH2\",\"RC\",\"843260.00\",\"817700.00\",\"6.10\",\"\",\"06/07/2021\",\"\"\r\n",
);

#[test]
fn test_read_ags3_delivery() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("TKO.AGS");
    fs::write(&path, AGS3_DELIVERY).unwrap();

    let ags = read_ags_file(&path).unwrap();
    assert_eq!(ags.version, AgsVersion::Ags3);
    assert_eq!(ags.group_names(), vec!["PROJ", "HOLE"]);

    let hole = ags.group("HOLE").unwrap();
    assert_eq!(hole.headings.len(), 8);
    assert_eq!(hole.row_count(), 2);
    assert_eq!(
        hole.values("HOLE_REM").unwrap(),
        vec!["Artesian water at 2.1m", ""]
    );

    let df = group_to_dataframe(hole).unwrap();
    assert_eq!(df.column("HOLE_GL").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("HOLE_ID").unwrap().dtype(), &DataType::String);

    let fdep = df.column("HOLE_FDEP").unwrap().as_materialized_series().f64().unwrap().clone();
    assert_eq!(fdep.get(0), Some(30.15));
    assert_eq!(fdep.get(1), None);

    let star = df.column("HOLE_STAR").unwrap().as_materialized_series().str().unwrap().clone();
    assert_eq!(star.get(1), Some("2021-07-06"));
}

#[test]
fn test_read_ags4_with_types() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("site.ags");
    fs::write(
        &path,
        concat!(
            "\"GROUP\",\"LOCA\"\n",
            "\"HEADING\",\"LOCA_ID\",\"LOCA_GL\",\"LOCA_CLNT\"\n",
            "\"UNIT\",\"\",\"m\",\"\"\n",
            "\"TYPE\",\"ID\",\"2DP\",\"X\"\n",
            "\"DATA\",\"001\",\"3.10\",\"1234\"\n",
        ),
    )
    .unwrap();

    let ags = read_ags_file(&path).unwrap();
    assert_eq!(ags.version, AgsVersion::Ags4);

    let loca = ags.group("LOCA").unwrap();
    assert_eq!(loca.units, vec!["", "m", ""]);

    let df = group_to_dataframe(loca).unwrap();
    assert_eq!(df.column("LOCA_GL").unwrap().dtype(), &DataType::Float64);
    // declared as text, so kept as text even though the value is numeric
    assert_eq!(df.column("LOCA_CLNT").unwrap().dtype(), &DataType::String);
    let ids = df.column("LOCA_ID").unwrap().as_materialized_series().str().unwrap().clone();
    assert_eq!(ids.get(0), Some("001"));
}
