//! Error handling for AGS processing operations.
//!
//! Provides error types with context for file discovery, AGS parsing,
//! coordinate reference system lookups, database merging and export.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input directory not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("No AGS files found in: {path}")]
    NoAgsFiles { path: PathBuf },

    #[error("Invalid AGS content in file: {path} - {reason}")]
    InvalidAgs { path: PathBuf, reason: String },

    #[error("Required group {group} missing from file: {path}")]
    MissingGroup { path: PathBuf, group: String },

    #[error("Location {location_id} in file {path} has no value for {field}")]
    MissingField {
        path: PathBuf,
        location_id: String,
        field: String,
    },

    #[error("Location {location_id} appears more than once in file: {path}")]
    DuplicateLocation { path: PathBuf, location_id: String },

    #[error("Unknown coordinate reference system: {identifier}")]
    UnknownCrs { identifier: String },

    #[error("Coordinate reference system mismatch: expected {expected}, found {found}")]
    CrsMismatch { expected: String, found: String },

    #[error("Column {column} not found in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl AgsError {
    pub fn invalid_ags(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidAgs {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl From<glob::PatternError> for AgsError {
    fn from(error: glob::PatternError) -> Self {
        Self::Configuration {
            message: format!("Invalid file pattern: {}", error),
        }
    }
}

impl From<walkdir::Error> for AgsError {
    fn from(error: walkdir::Error) -> Self {
        let message = error.to_string();
        Self::Io(
            error
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other(message)),
        )
    }
}

pub type Result<T> = std::result::Result<T, AgsError>;
