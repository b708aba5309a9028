//! Main processing engine.
//!
//! Orchestrates the complete AGS workflow: file discovery, per-file
//! conversion on blocking tasks, database merge, geometry derivation and
//! export of the web map files.

pub mod discovery;

#[cfg(test)]
pub mod tests;

use self::discovery::FileDiscovery;

use crate::config::ProcessorConfig;
use crate::database::{StandardizedDatabase, merge_databases};
use crate::error::{AgsError, Result};
use crate::export::{join_location_attributes, write_geojson, write_grouped_json};
use crate::geospatial::create_geodatabase;
use crate::mapping::convert_ags_file;
use crate::models::{ExportSummary, ProcessingStats};

use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tokio::task;
use tracing::{debug, warn};

/// Run blocking work off the async runtime
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| AgsError::Interrupted {
            reason: format!("blocking task failed: {}", e),
        })?
}

/// Main processor for AGS to web map conversion
#[derive(Debug)]
pub struct Processor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    config: ProcessorConfig,
}

impl Processor {
    /// Create a new processor
    pub fn new(input_dir: PathBuf, output_dir: PathBuf) -> Result<Self> {
        if !input_dir.is_dir() {
            return Err(AgsError::InputNotFound { path: input_dir });
        }

        Ok(Self {
            input_dir,
            output_dir,
            config: ProcessorConfig::default(),
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        let crs = self.config.validate()?;

        println!("{}", "Starting AGS processing".bright_green().bold());
        println!("  {} {}", "Input:".bright_cyan(), self.input_dir.display());
        println!("  {} {}", "Output:".bright_cyan(), self.output_dir.display());
        println!(
            "  {} {} + {}",
            "CRS:".bright_cyan(),
            crs.horizontal,
            crs.vertical
        );

        // Step 1: Discover AGS files
        println!("\n{}", "Discovering AGS files...".bright_yellow());
        let files = FileDiscovery::new(self.input_dir.clone())
            .with_recursive(self.config.recursive)
            .discover_ags_files()
            .await?;
        println!(
            "  {} {} AGS files",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold()
        );

        // Step 2: Convert each file
        println!("\n{}", "Converting files...".bright_yellow());
        let databases = self.convert_files(&files).await?;

        // Step 3: Merge
        println!("\n{}", "Merging databases...".bright_yellow());
        let merged = run_blocking(move || merge_databases(databases)).await?;

        let mut stats = ProcessingStats {
            files_found: files.len(),
            files_converted: files.len(),
            projects: merged.project.height(),
            locations: merged.location_count(),
            in_situ_rows: merged.in_situ_counts(),
            ..Default::default()
        };

        // Step 4: Derive geometry and write outputs
        println!("\n{}", "Writing outputs...".bright_yellow());
        let config = self.config.clone();
        let output_dir = self.output_dir.clone();
        stats.outputs = run_blocking(move || export_outputs(&merged, &config, &output_dir)).await?;
        stats.processing_time_ms = start_time.elapsed().as_millis();

        print_summary(&stats);
        Ok(stats)
    }

    /// Convert files with bounded concurrency, keeping file order. Stops at
    /// the first failure.
    async fn convert_files(&self, files: &[PathBuf]) -> Result<Vec<StandardizedDatabase>> {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| AgsError::configuration(format!("progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        let horizontal = self.config.horizontal_crs.clone();
        let vertical = self.config.vertical_crs.clone();

        let conversions = stream::iter(files.iter().cloned())
            .map(|path| {
                let horizontal = horizontal.clone();
                let vertical = vertical.clone();
                async move {
                    let display = path.display().to_string();
                    let result =
                        run_blocking(move || convert_ags_file(&path, &horizontal, &vertical)).await;
                    (display, result)
                }
            })
            .buffered(self.config.max_concurrent_files.max(1));
        let mut conversions = std::pin::pin!(conversions);

        let mut databases = Vec::with_capacity(files.len());
        while let Some((path, result)) = conversions.next().await {
            match result {
                Ok(db) => {
                    debug!("Converted {}: {} locations", path, db.location_count());
                    pb.set_message(path);
                    pb.inc(1);
                    databases.push(db);
                }
                Err(e) => {
                    pb.abandon_with_message(format!("failed on {}", path));
                    return Err(e);
                }
            }
        }
        pb.finish_with_message("done");

        Ok(databases)
    }
}

/// Derive geometry, join attributes and write every output file
fn export_outputs(
    merged: &StandardizedDatabase,
    config: &ProcessorConfig,
    output_dir: &std::path::Path,
) -> Result<Vec<ExportSummary>> {
    let geodb = create_geodatabase(merged)?;
    let mut outputs = Vec::new();

    let locations = join_location_attributes(&geodb, &config.location_columns, &config.join_key)?;
    let path = output_dir.join(&config.locations_file);
    let entries = write_geojson(&locations, &path)?;
    outputs.push(ExportSummary { path, entries });

    for export in &config.in_situ_exports {
        let Some(table) = geodb.in_situ.get(&export.group) else {
            warn!(
                "No {} data in the merged database, skipping {}",
                export.group, export.file_name
            );
            continue;
        };
        let path = output_dir.join(&export.file_name);
        let entries = write_grouped_json(table, &path)?;
        outputs.push(ExportSummary { path, entries });
    }

    Ok(outputs)
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files converted:".bright_cyan(),
        stats.files_converted.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Projects:".bright_cyan(),
        stats.projects.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Locations:".bright_cyan(),
        stats.locations.to_string().bright_white().bold()
    );
    for (group, rows) in &stats.in_situ_rows {
        println!(
            "  {} {} rows",
            format!("{}:", group).bright_cyan(),
            rows.to_string().bright_white()
        );
    }
    for output in &stats.outputs {
        println!(
            "  {} {} ({} entries)",
            "Wrote".bright_green(),
            output.path.display(),
            output.entries
        );
    }
}
