//! Result types reported by the processing pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_found: usize,
    pub files_converted: usize,
    pub projects: usize,
    pub locations: usize,
    /// Rows per in-situ group of the merged database
    pub in_situ_rows: BTreeMap<String, usize>,
    pub outputs: Vec<ExportSummary>,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    pub fn output_paths(&self) -> Vec<&PathBuf> {
        self.outputs.iter().map(|o| &o.path).collect()
    }
}

/// One written output file
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    /// Features for GeoJSON, location keys for grouped JSON
    pub entries: usize,
}
