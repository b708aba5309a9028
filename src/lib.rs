//! AGS Processor Library
//!
//! Converts geotechnical ground investigation data delivered as AGS3 or AGS4
//! files into the files a web map needs: a GeoJSON layer of boreholes in
//! WGS84 and per-borehole JSON tables of in-situ test data.
//!
//! This library provides tools for:
//! - Reading AGS3 and AGS4 files into typed tables
//! - Mapping each file onto a standardized schema with unique identifiers
//! - Merging many files into one database
//! - Deriving borehole geometry and WGS84 positions from projected grids
//! - Writing GeoJSON and location-grouped JSON

pub mod ags;
pub mod cli;
pub mod config;
pub mod constants;
pub mod crs;
pub mod database;
pub mod error;
pub mod export;
pub mod frame;
pub mod geospatial;
pub mod mapping;
pub mod models;
pub mod processor;

pub use config::{InSituExport, ProcessorConfig};
pub use crs::{CrsPair, HorizontalCrs, VerticalCrs};
pub use database::{StandardizedDatabase, merge_databases};
pub use error::{AgsError, Result};
pub use export::{join_location_attributes, write_geojson, write_grouped_json};
pub use geospatial::{GeoFrame, Geometry, GeospatialDatabase, create_geodatabase};
pub use mapping::{ags_to_mapping, convert_ags_file, map_to_database};
pub use models::ProcessingStats;
pub use processor::Processor;
