//! Artifact emission and the saved-flowchart history.
//!
//! Every emitted diagram is written twice, side by side:
//!
//! ```text
//! <out_dir>/<Safe_Title>_<YYYYMMDD_HHMMSS>_flow.json   (baseline-loadable)
//! <out_dir>/<Safe_Title>_<YYYYMMDD_HHMMSS>_flow.html   (self-contained viewer)
//! ```

pub mod history;
pub mod html;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::fs;

use crate::models::Diagram;
use crate::steps::StepError;

pub use history::{display_name, rendering_path, HistoryStore};

/// Stem used when the diagram carries no title.
pub const UNTITLED: &str = "untitled_flow";

/// Persists an approved diagram and returns the path of its rendering.
#[async_trait]
pub trait ArtifactEmitter: Send + Sync {
    async fn emit(&self, diagram: &Diagram) -> Result<PathBuf, StepError>;
}

/// Writes JSON + HTML pairs into a directory.
#[derive(Debug, Clone)]
pub struct FileEmitter {
    out_dir: PathBuf,
}

impl FileEmitter {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    async fn write(&self, diagram: &Diagram, stem: &str) -> Result<PathBuf, StepError> {
        fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| StepError::Io(format!("Failed to create {}: {}", self.out_dir.display(), e)))?;

        let json = serde_json::to_string_pretty(diagram)
            .map_err(|e| StepError::Io(format!("Failed to serialize diagram: {}", e)))?;
        let json_path = self.out_dir.join(format!("{}.json", stem));
        fs::write(&json_path, json)
            .await
            .map_err(|e| StepError::Io(format!("Failed to save JSON: {}", e)))?;

        let page = html::render(diagram)?;
        let html_path = self.out_dir.join(format!("{}.html", stem));
        fs::write(&html_path, page)
            .await
            .map_err(|e| StepError::Io(format!("Failed to save HTML: {}", e)))?;

        Ok(html_path)
    }
}

#[async_trait]
impl ArtifactEmitter for FileEmitter {
    async fn emit(&self, diagram: &Diagram) -> Result<PathBuf, StepError> {
        let stem = file_stem(&diagram.overview.title, Local::now());
        let path = self.write(diagram, &stem).await?;
        tracing::info!("[Emitter] Wrote {}", path.display());
        Ok(path)
    }
}

/// Replace everything but ASCII letters and digits with `_`.
pub fn safe_title(title: &str) -> String {
    let title = if title.is_empty() { UNTITLED } else { title };
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `<safe_title>_<YYYYMMDD_HHMMSS>_flow`
pub fn file_stem(title: &str, at: DateTime<Local>) -> String {
    format!("{}_{}_flow", safe_title(title), at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, ConnectionLabel, Node, NodeKind, Overview};
    use chrono::TimeZone;

    fn sample() -> Diagram {
        Diagram {
            overview: Overview {
                title: "Order Flow".to_string(),
                summary: "Handles orders".to_string(),
            },
            nodes: vec![
                Node::new("start", NodeKind::Start, "Order placed").at(0, 0),
                Node::new("end", NodeKind::End, "Shipped").at(0, 150),
            ],
            connections: vec![Connection::new("start", "end", ConnectionLabel::Out)],
        }
    }

    #[test]
    fn test_safe_title() {
        assert_eq!(safe_title("Order Flow v2!"), "Order_Flow_v2_");
        assert_eq!(safe_title(""), "untitled_flow");
        assert_eq!(safe_title("Café"), "Caf_");
    }

    #[test]
    fn test_file_stem_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(file_stem("Order Flow", at), "Order_Flow_20240305_140709_flow");
    }

    #[tokio::test]
    async fn test_emit_writes_json_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = FileEmitter::new(dir.path().join("out"));
        let diagram = sample();

        let html_path = emitter.emit(&diagram).await.unwrap();
        assert_eq!(html_path.extension().and_then(|e| e.to_str()), Some("html"));
        let name = html_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Order_Flow_"));
        assert!(name.ends_with("_flow.html"));

        let json_path = html_path.with_extension("json");
        let saved: Diagram =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(saved, diagram);

        let page = std::fs::read_to_string(&html_path).unwrap();
        assert!(page.contains("Order Flow"));
    }
}
