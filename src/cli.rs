//! Command-line interface components.

use crate::config::ProcessorConfig;
use crate::models::ProcessingStats;
use crate::processor::Processor;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "ags-processor")]
#[command(about = "Convert AGS ground investigation files to GeoJSON and JSON for web maps")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Directory containing .ags files
    #[arg(value_name = "INPUT_DIR", default_value = ".")]
    pub input_dir: PathBuf,

    /// Directory the output files are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Horizontal CRS of the AGS coordinates, e.g. EPSG:2326
    #[arg(long, value_name = "EPSG")]
    pub horizontal_crs: Option<String>,

    /// Vertical datum of the AGS ground levels, e.g. EPSG:5738
    #[arg(long, value_name = "EPSG")]
    pub vertical_crs: Option<String>,

    /// Location columns added to the map features. AGS3 names (HOLE_ID) and
    /// AGS4 names (LOCA_ID) each fall back to the other when absent
    #[arg(long, value_delimiter = ',', value_name = "COLUMNS")]
    pub columns: Option<Vec<String>>,

    /// Search subdirectories for AGS files
    #[arg(short, long)]
    pub recursive: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Defaults, then the config file, then flags given on the command line
    pub fn resolve_config(&self) -> Result<ProcessorConfig> {
        let mut config = ProcessorConfig::load(self.config.as_deref())
            .context("Failed to load configuration")?;

        if let Some(horizontal) = &self.horizontal_crs {
            config.horizontal_crs = horizontal.clone();
        }
        if let Some(vertical) = &self.vertical_crs {
            config.vertical_crs = vertical.clone();
        }
        if let Some(columns) = &self.columns {
            config.location_columns = columns
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if self.recursive {
            config.recursive = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ags_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

/// Run the conversion described by the arguments
pub async fn run(args: Args) -> Result<ProcessingStats> {
    let config = args.resolve_config()?;
    info!(
        "Processing {} with {} + {}",
        args.input_dir.display(),
        config.horizontal_crs,
        config.vertical_crs
    );

    let processor = Processor::new(args.input_dir.clone(), args.output_dir.clone())
        .with_context(|| format!("Cannot read input directory {}", args.input_dir.display()))?
        .with_config(config);

    let stats = processor.process().await.context("AGS processing failed")?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["ags-processor"]).unwrap();
        assert_eq!(args.input_dir, PathBuf::from("."));
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.get_log_level(), "info");
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "ags-processor",
            "data/ags",
            "-o",
            "web",
            "--horizontal-crs",
            "EPSG:27700",
            "--vertical-crs",
            "EPSG:5701",
            "--columns",
            "HOLE_ID, HOLE_TYPE",
            "--recursive",
            "--config",
            "/nonexistent/ags-processor.toml",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.columns.as_ref().unwrap().len(), 2);
        assert_eq!(args.get_log_level(), "trace");
        assert!(args.resolve_config().is_err());

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "horizontal_crs = \"EPSG:2326\"\nlocation_columns = [\"HOLE_REM\"]\nmax_concurrent_files = 3\n",
        )
        .unwrap();

        let args = Args {
            config: Some(config_path),
            ..args
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.max_concurrent_files, 3);
        assert_eq!(config.horizontal_crs, "EPSG:27700");
        assert_eq!(config.vertical_crs, "EPSG:5701");
        assert_eq!(config.location_columns, vec!["HOLE_ID", "HOLE_TYPE"]);
        assert!(config.recursive);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["ags-processor", "-q", "-v"]).is_err());
        let args = Args::try_parse_from(["ags-processor", "-q"]).unwrap();
        assert_eq!(args.get_log_level(), "warn");
    }
}
