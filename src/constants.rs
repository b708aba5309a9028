//! Application constants for the AGS processor
//!
//! Column names of the standardized schema, AGS group and heading names,
//! and default output settings used throughout the crate.

// =============================================================================
// Standardized Schema Columns
// =============================================================================

/// Standardized column names shared by every table of a database
pub mod columns {
    pub const PROJECT_UID: &str = "project_uid";
    pub const LOCATION_UID: &str = "location_uid";
    pub const SAMPLE_UID: &str = "sample_uid";
    pub const LOCATION_SOURCE_ID: &str = "location_source_id";
    pub const LOCATION_TYPE: &str = "location_type";
    pub const EASTING: &str = "easting";
    pub const NORTHING: &str = "northing";
    pub const GROUND_LEVEL_ELEVATION: &str = "ground_level_elevation";
    pub const DEPTH_TO_TOP: &str = "depth_to_top";
    pub const DEPTH_TO_BASE: &str = "depth_to_base";
    pub const HORIZONTAL_CRS: &str = "horizontal_crs";
    pub const VERTICAL_CRS: &str = "vertical_crs";

    /// LonLatHeight table columns
    pub const LONGITUDE: &str = "longitude";
    pub const LATITUDE: &str = "latitude";
    pub const EGM2008_GROUND_LEVEL_HEIGHT: &str = "egm2008_ground_level_height";

    /// Geometry pseudo-column, held beside the DataFrame rather than in it
    pub const GEOMETRY: &str = "geometry";
}

// =============================================================================
// AGS Format
// =============================================================================

/// AGS4 descriptor keywords (first field of every line)
pub mod ags4 {
    pub const GROUP: &str = "GROUP";
    pub const HEADING: &str = "HEADING";
    pub const UNIT: &str = "UNIT";
    pub const TYPE: &str = "TYPE";
    pub const DATA: &str = "DATA";
}

/// AGS3 line markers
pub mod ags3 {
    pub const GROUP_PREFIX: &str = "**";
    pub const HEADING_PREFIX: &str = "*";
    pub const UNITS: &str = "<UNITS>";
    pub const CONT: &str = "<CONT>";
}

/// Group names with a fixed role in the standardized schema
pub mod groups {
    pub const PROJECT: &str = "PROJ";
    pub const LOCATION_AGS3: &str = "HOLE";
    pub const LOCATION_AGS4: &str = "LOCA";
    pub const SAMPLE: &str = "SAMP";
}

/// Project identifier heading (same in AGS3 and AGS4)
pub const PROJECT_ID_HEADING: &str = "PROJ_ID";

/// Sample headings used to build sample identifiers and detect lab tests
pub mod sample_headings {
    pub const REFERENCE: &str = "SAMP_REF";
    pub const TYPE: &str = "SAMP_TYPE";
    pub const TOP: &str = "SAMP_TOP";
    pub const SPECIMEN_DEPTH: &str = "SPEC_DPTH";
}

/// Suffixes tried, in order, to find the top depth heading of a group
pub const TOP_DEPTH_SUFFIXES: &[&str] = &["_TOP", "_DPTH", "_DEP"];

/// Suffixes tried, in order, to find the base depth heading of a group
pub const BASE_DEPTH_SUFFIXES: &[&str] = &["_BASE", "_BOT"];

/// AGS4 TYPE suffixes that denote numeric columns (2DP, 3SF, 2SCI ...)
pub const NUMERIC_TYPE_SUFFIXES: &[&str] = &["DP", "SF", "SCI"];

/// AGS4 TYPE of date columns
pub const DATE_TYPE: &str = "DT";

/// Legacy AGS3 date format
pub const AGS3_DATE_FORMAT: &str = "%d/%m/%Y";

/// ISO date format written to the outputs
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Defaults
// =============================================================================

/// Hong Kong 1980 Grid System
pub const DEFAULT_HORIZONTAL_CRS: &str = "EPSG:2326";

/// Hong Kong Principal Datum
pub const DEFAULT_VERTICAL_CRS: &str = "EPSG:5738";

/// Location columns displayed on the web map
pub const DEFAULT_LOCATION_COLUMNS: &[&str] =
    &["HOLE_ID", "HOLE_TYPE", "HOLE_STAR", "HOLE_ENDD", "HOLE_REM"];

/// Locations output file
pub const DEFAULT_LOCATIONS_FILE: &str = "locations.geojson";

/// In-situ test groups exported by default, with their output file names
pub const DEFAULT_IN_SITU_EXPORTS: &[(&str, &str)] =
    &[("GEOL", "geol.json"), ("ISPT", "ispt.json")];

/// Application directory name under the user config directory
pub const CONFIG_DIR_NAME: &str = "ags-processor";

/// Config file name looked up in the application config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";
