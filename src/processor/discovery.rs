//! File discovery module for AGS deliveries
//!
//! Finds AGS files in an input directory, matching the extension without
//! regard to case, optionally descending into subdirectories.

use crate::error::{AgsError, Result};
use glob::{MatchOptions, glob_with};
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::debug;
use walkdir::WalkDir;

/// File discovery component for AGS files
#[derive(Debug)]
pub struct FileDiscovery {
    input_dir: PathBuf,
    recursive: bool,
}

impl FileDiscovery {
    /// Create a new file discovery instance
    pub fn new(input_dir: PathBuf) -> Self {
        Self {
            input_dir,
            recursive: false,
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Discover all AGS files, sorted by path
    ///
    /// Fails with `NoAgsFiles` when the directory holds none.
    pub async fn discover_ags_files(&self) -> Result<Vec<PathBuf>> {
        let input_dir = self.input_dir.clone();
        let recursive = self.recursive;

        let files = task::spawn_blocking(move || find_ags_files(&input_dir, recursive))
            .await
            .map_err(|e| AgsError::Interrupted {
                reason: format!("file discovery task failed: {}", e),
            })??;

        if files.is_empty() {
            return Err(AgsError::NoAgsFiles {
                path: self.input_dir.clone(),
            });
        }
        debug!(
            "Found {} AGS files in {}",
            files.len(),
            self.input_dir.display()
        );
        Ok(files)
    }
}

/// Blocking discovery; an empty result is not an error here
pub fn find_ags_files(input_dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(AgsError::InputNotFound {
            path: input_dir.to_path_buf(),
        });
    }

    let mut files = if recursive {
        let mut files = Vec::new();
        for entry in WalkDir::new(input_dir).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() && is_ags_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files
    } else {
        let options = MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let pattern = format!(
            "{}/*.ags",
            glob::Pattern::escape(&input_dir.to_string_lossy())
        );
        let mut files = Vec::new();
        for entry in glob_with(&pattern, options)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => return Err(AgsError::Io(e.into_error())),
            }
        }
        files
    };

    files.sort();
    Ok(files)
}

/// Check if a path has an `.ags` extension in any case
pub fn is_ags_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("ags"))
}
