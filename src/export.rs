//! Attribute join and the GeoJSON and grouped JSON writers.

use crate::constants::columns;
use crate::error::{AgsError, Result};
use crate::frame::{Record, has_column, string_values, to_records};
use crate::geospatial::{GeoFrame, Geometry, GeospatialDatabase};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

const ROW_ORDER: &str = "__row_order";

/// Left-join location attributes onto the LonLatHeight table.
///
/// Row order and count of LonLatHeight are kept, so its geometries stay
/// aligned. `longitude` and `latitude` are dropped from the result.
pub fn join_location_attributes(
    geodb: &GeospatialDatabase,
    attribute_columns: &[String],
    key: &str,
) -> Result<GeoFrame> {
    let location = &geodb.location.frame;
    let lon_lat_height = &geodb.lon_lat_height;

    if !has_column(location, key) {
        return Err(AgsError::column_not_found("Location", key));
    }
    if !has_column(&lon_lat_height.frame, key) {
        return Err(AgsError::column_not_found("LonLatHeight", key));
    }

    let mut selected: Vec<String> = vec![key.to_string()];
    for column in attribute_columns {
        let column = location_heading(location, column)
            .ok_or_else(|| AgsError::column_not_found("Location", column.as_str()))?;
        if !selected.contains(&column) && !has_column(&lon_lat_height.frame, &column) {
            selected.push(column);
        }
    }

    let attributes = location.select(selected.iter().map(String::as_str))?;

    let joined = lon_lat_height
        .frame
        .clone()
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(
            attributes.lazy(),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(ROW_ORDER)], SortMultipleOptions::default())
        .collect()?;

    if joined.height() != lon_lat_height.height() {
        return Err(AgsError::configuration(format!(
            "joining location attributes on {} changed the row count from {} to {}",
            key,
            lon_lat_height.height(),
            joined.height()
        )));
    }

    let mut joined = joined.drop(ROW_ORDER)?;
    for column in [columns::LONGITUDE, columns::LATITUDE] {
        if has_column(&joined, column) {
            joined = joined.drop(column)?;
        }
    }

    debug!(
        "Joined {} location columns onto {} rows",
        selected.len() - 1,
        joined.height()
    );

    Ok(GeoFrame::new(joined, lon_lat_height.geometry.clone()))
}

/// `column` itself, or its AGS3/AGS4 counterpart (HOLE_ID and LOCA_ID) when
/// only that one is present
fn location_heading(location: &DataFrame, column: &str) -> Option<String> {
    if has_column(location, column) {
        return Some(column.to_string());
    }
    let counterpart = if let Some(suffix) = column.strip_prefix("HOLE_") {
        format!("LOCA_{}", suffix)
    } else if let Some(suffix) = column.strip_prefix("LOCA_") {
        format!("HOLE_{}", suffix)
    } else {
        return None;
    };
    if has_column(location, &counterpart) {
        debug!("Location column {} taken from {}", column, counterpart);
        Some(counterpart)
    } else {
        None
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write a table as a GeoJSON FeatureCollection, replacing any existing file.
/// Returns the number of features written.
pub fn write_geojson(table: &GeoFrame, path: &Path) -> Result<usize> {
    let records = to_records(&table.frame, &[columns::GEOMETRY])?;

    let features: Vec<Feature> = records
        .into_iter()
        .zip(&table.geometry)
        .enumerate()
        .map(|(index, (properties, geometry))| Feature {
            bbox: None,
            geometry: geometry.as_ref().map(Geometry::to_geojson),
            id: Some(Id::String(index.to_string())),
            properties: Some(properties),
            foreign_members: None,
        })
        .collect();

    let count = features.len();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let mut writer = create_writer(path)?;
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;

    info!("Wrote {} features to {}", count, path.display());
    Ok(count)
}

/// Rows grouped by `location_uid`, geometry left out
pub fn group_by_location(table: &GeoFrame) -> Result<BTreeMap<String, Vec<Record>>> {
    let keys = string_values(&table.frame, "InSitu", columns::LOCATION_UID)?;
    let records = to_records(&table.frame, &[columns::GEOMETRY])?;

    let mut grouped: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    let mut skipped = 0;
    for (key, record) in keys.into_iter().zip(records) {
        match key {
            Some(key) => grouped.entry(key).or_default().push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} rows without a location_uid", skipped);
    }
    Ok(grouped)
}

/// Write `{location_uid: [row, ...]}`, replacing any existing file.
/// Returns the number of locations written.
pub fn write_grouped_json(table: &GeoFrame, path: &Path) -> Result<usize> {
    let grouped = group_by_location(table)?;

    let mut writer = create_writer(path)?;
    serde_json::to_writer(&mut writer, &grouped)?;
    writer.flush()?;

    info!(
        "Wrote {} rows for {} locations to {}",
        table.height(),
        grouped.len(),
        path.display()
    );
    Ok(grouped.len())
}
