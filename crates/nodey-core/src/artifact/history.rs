//! Saved flowcharts available as edit baselines.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::models::Diagram;
use crate::steps::StepError;

/// Name written by early versions, still offered as a baseline.
pub const LEGACY_FILE: &str = "flowchart.json";

#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `*_flow.json` plus the legacy file, sorted by file name.
    pub fn list(&self) -> Result<Vec<PathBuf>, StepError> {
        let pattern = format!("{}/*.json", Pattern::escape(&self.dir.to_string_lossy()));
        let paths = glob::glob_with(&pattern, MatchOptions::new())
            .map_err(|e| StepError::Io(format!("Invalid history pattern: {}", e)))?;

        let mut found = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() && is_saved_flowchart(&path) => found.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("[History] Skipping unreadable entry: {}", e),
            }
        }

        found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        tracing::debug!("[History] {} saved flowchart(s) in {}", found.len(), self.dir.display());
        Ok(found)
    }

    pub fn load(&self, path: &Path) -> Result<Diagram, StepError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StepError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| StepError::Schema(format!("{} is not a saved flowchart: {}", path.display(), e)))
    }
}

fn is_saved_flowchart(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.ends_with("_flow.json") || name.eq_ignore_ascii_case(LEGACY_FILE))
        .unwrap_or(false)
}

/// File name shown in the history browser.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The HTML rendering saved next to a JSON file.
pub fn rendering_path(json: &Path) -> PathBuf {
    json.with_extension("html")
}
