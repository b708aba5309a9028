//! AGS ground investigation file format.
//!
//! Reads AGS3 and AGS4 files into an ordered list of groups (tables) and
//! converts groups into typed Polars DataFrames.

pub mod reader;
pub mod table;

pub use reader::{parse_ags_str, read_ags_file};
pub use table::group_to_dataframe;

use std::fmt;
use std::path::PathBuf;

/// AGS format edition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgsVersion {
    Ags3,
    Ags4,
}

impl AgsVersion {
    /// Heading that identifies a location in this edition
    pub fn location_id_heading(&self) -> &'static str {
        match self {
            AgsVersion::Ags3 => "HOLE_ID",
            AgsVersion::Ags4 => "LOCA_ID",
        }
    }

    /// Name of the location group in this edition
    pub fn location_group(&self) -> &'static str {
        match self {
            AgsVersion::Ags3 => crate::constants::groups::LOCATION_AGS3,
            AgsVersion::Ags4 => crate::constants::groups::LOCATION_AGS4,
        }
    }
}

impl fmt::Display for AgsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgsVersion::Ags3 => write!(f, "AGS3"),
            AgsVersion::Ags4 => write!(f, "AGS4"),
        }
    }
}

/// One AGS group: headings plus string cells, row width == heading count
#[derive(Debug, Clone, PartialEq)]
pub struct AgsGroup {
    pub name: String,
    pub headings: Vec<String>,
    pub units: Vec<String>,
    /// AGS4 TYPE row; empty for AGS3
    pub types: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl AgsGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headings: Vec::new(),
            units: Vec::new(),
            types: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn heading_index(&self, heading: &str) -> Option<usize> {
        self.headings.iter().position(|h| h == heading)
    }

    pub fn has_heading(&self, heading: &str) -> bool {
        self.heading_index(heading).is_some()
    }

    /// Values of one heading, in row order
    pub fn values(&self, heading: &str) -> Option<Vec<&str>> {
        let index = self.heading_index(heading)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// AGS4 data type of a heading, if the file declared one
    pub fn type_of(&self, index: usize) -> Option<&str> {
        self.types
            .get(index)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Parsed AGS file with groups in file order
#[derive(Debug, Clone)]
pub struct AgsFile {
    pub path: PathBuf,
    pub version: AgsVersion,
    pub groups: Vec<AgsGroup>,
}

impl AgsFile {
    pub fn group(&self, name: &str) -> Option<&AgsGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }
}
