//! Configuration management and validation.
//!
//! Provides the processing configuration: coordinate reference systems,
//! discovery options, the location attributes joined onto the map layer and
//! the in-situ groups exported per location.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_HORIZONTAL_CRS, DEFAULT_IN_SITU_EXPORTS,
    DEFAULT_LOCATION_COLUMNS, DEFAULT_LOCATIONS_FILE, DEFAULT_VERTICAL_CRS, columns,
};
use crate::crs::CrsPair;
use crate::error::{AgsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An in-situ group written as `{location_uid: [rows]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InSituExport {
    /// AGS group name, e.g. GEOL
    pub group: String,

    /// Output file name relative to the output directory
    pub file_name: String,
}

impl InSituExport {
    pub fn new(group: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            file_name: file_name.into(),
        }
    }
}

/// Main configuration for AGS processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Horizontal CRS of the easting/northing columns
    pub horizontal_crs: String,

    /// Vertical datum of the ground level column
    pub vertical_crs: String,

    /// Search subdirectories for AGS files
    pub recursive: bool,

    /// Location columns joined onto the map layer
    pub location_columns: Vec<String>,

    /// Join key between Location and LonLatHeight
    pub join_key: String,

    /// File name of the GeoJSON map layer
    pub locations_file: String,

    /// In-situ groups exported per location
    pub in_situ_exports: Vec<InSituExport>,

    /// Maximum concurrent file conversions
    pub max_concurrent_files: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            horizontal_crs: DEFAULT_HORIZONTAL_CRS.to_string(),
            vertical_crs: DEFAULT_VERTICAL_CRS.to_string(),
            recursive: false,
            location_columns: DEFAULT_LOCATION_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            join_key: columns::LOCATION_UID.to_string(),
            locations_file: DEFAULT_LOCATIONS_FILE.to_string(),
            in_situ_exports: DEFAULT_IN_SITU_EXPORTS
                .iter()
                .map(|(group, file)| InSituExport::new(*group, *file))
                .collect(),
            max_concurrent_files: num_cpus::get(),
        }
    }
}

impl ProcessorConfig {
    /// Load a TOML configuration file; missing keys take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            AgsError::configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `<config_dir>/ags-processor/config.toml` for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Explicit file when given, else the user config file when it exists,
    /// else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AgsError::configuration(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_from_file(path)
            }
            None => match Self::default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::load_from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Set both coordinate reference systems
    pub fn with_crs(mut self, horizontal: impl Into<String>, vertical: impl Into<String>) -> Self {
        self.horizontal_crs = horizontal.into();
        self.vertical_crs = vertical.into();
        self
    }

    /// Search subdirectories
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the location columns joined onto the map layer
    pub fn with_location_columns(mut self, columns: Vec<String>) -> Self {
        self.location_columns = columns;
        self
    }

    /// Set the exported in-situ groups
    pub fn with_in_situ_exports(mut self, exports: Vec<InSituExport>) -> Self {
        self.in_situ_exports = exports;
        self
    }

    /// Set the GeoJSON file name
    pub fn with_locations_file(mut self, file_name: impl Into<String>) -> Self {
        self.locations_file = file_name.into();
        self
    }

    /// Set maximum concurrent files
    pub fn with_max_concurrent_files(mut self, max_files: usize) -> Self {
        self.max_concurrent_files = max_files;
        self
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<CrsPair> {
        if self.max_concurrent_files == 0 {
            return Err(AgsError::configuration(
                "max_concurrent_files must be at least 1",
            ));
        }
        if self.locations_file.trim().is_empty() {
            return Err(AgsError::configuration("locations_file must not be empty"));
        }
        if let Some(export) = self
            .in_situ_exports
            .iter()
            .find(|e| e.group.trim().is_empty() || e.file_name.trim().is_empty())
        {
            return Err(AgsError::configuration(format!(
                "in-situ export needs a group and a file name: {:?}",
                export
            )));
        }
        CrsPair::from_identifiers(&self.horizontal_crs, &self.vertical_crs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.horizontal_crs, "EPSG:2326");
        assert_eq!(config.vertical_crs, "EPSG:5738");
        assert_eq!(
            config.location_columns,
            vec!["HOLE_ID", "HOLE_TYPE", "HOLE_STAR", "HOLE_ENDD", "HOLE_REM"]
        );
        assert_eq!(config.in_situ_exports[0], InSituExport::new("GEOL", "geol.json"));
        assert_eq!(config.in_situ_exports[1], InSituExport::new("ISPT", "ispt.json"));
        assert!(config.max_concurrent_files >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
horizontal_crs = "EPSG:27700"
vertical_crs = "EPSG:5701"
location_columns = ["HOLE_ID"]

[[in_situ_exports]]
group = "GEOL"
file_name = "geology.json"
"#,
        )
        .unwrap();

        let config = ProcessorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.horizontal_crs, "EPSG:27700");
        assert_eq!(config.location_columns, vec!["HOLE_ID"]);
        assert_eq!(config.in_situ_exports.len(), 1);
        assert_eq!(config.locations_file, "locations.geojson");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "recursive = \"yes\"").unwrap();
        assert!(matches!(
            ProcessorConfig::load(Some(&path)),
            Err(AgsError::Configuration { .. })
        ));

        let missing = temp_dir.path().join("missing.toml");
        assert!(ProcessorConfig::load(Some(&missing)).is_err());

        let config = ProcessorConfig::default().with_max_concurrent_files(0);
        assert!(config.validate().is_err());

        let config = ProcessorConfig::default().with_crs("EPSG:5738", "EPSG:2326");
        assert!(matches!(config.validate(), Err(AgsError::UnknownCrs { .. })));
    }
}
