//! TraceWriter — optional JSONL mirror of the session log.
//!
//! Storage path: `<root>/.nodey/traces/{day}/session-{datetime}.jsonl`
//!
//! One file per process run, rotated when the day changes. Write failures
//! are logged and never reach the workflow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};

use crate::session::{Actor, LogEntry, Mode};

/// One log entry as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub session_id: String,
    pub at: DateTime<Utc>,
    /// State the session entered with this entry.
    pub mode: Mode,
    pub actor: Actor,
    pub message: String,
}

impl TraceRecord {
    pub fn from_entry(session_id: &str, mode: Mode, entry: &LogEntry) -> Self {
        Self {
            session_id: session_id.to_string(),
            at: entry.at,
            mode,
            actor: entry.actor,
            message: entry.message.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TraceWriter {
    base_dir: PathBuf,
    current_file: Arc<Mutex<Option<CurrentFile>>>,
}

struct CurrentFile {
    date: String,
    path: PathBuf,
}

impl TraceWriter {
    /// Traces are stored in `<root>/.nodey/traces/`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_base_dir(root.as_ref().join(".nodey").join("traces"))
    }

    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            current_file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn append(&self, record: &TraceRecord) -> Result<PathBuf, TraceWriteError> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let file_path = self.file_for(&today).await?;

        let mut line = serde_json::to_string(record)
            .map_err(|e| TraceWriteError::Serialization(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await
            .map_err(|e| TraceWriteError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| TraceWriteError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| TraceWriteError::Io(e.to_string()))?;

        Ok(file_path)
    }

    /// Append, logging errors but never failing.
    pub async fn append_safe(&self, record: &TraceRecord) {
        if let Err(e) = self.append(record).await {
            tracing::warn!("[TraceWriter] Failed to write trace: {}", e);
        }
    }

    /// Move the writer onto a background task that appends records in the
    /// order they are sent.
    pub fn spawn(self) -> TraceSink {
        let (tx, mut rx) = mpsc::unbounded_channel::<TraceRecord>();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                self.append_safe(&record).await;
            }
        });
        TraceSink { tx }
    }

    async fn file_for(&self, date: &str) -> Result<PathBuf, TraceWriteError> {
        let mut current = self.current_file.lock().await;
        if let Some(ref cf) = *current {
            if cf.date == date {
                return Ok(cf.path.clone());
            }
        }

        let day_dir = self.base_dir.join(date);
        fs::create_dir_all(&day_dir)
            .await
            .map_err(|e| TraceWriteError::Io(format!("Failed to create trace dir: {}", e)))?;

        let datetime = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let path = day_dir.join(format!("session-{}.jsonl", datetime));
        *current = Some(CurrentFile {
            date: date.to_string(),
            path: path.clone(),
        });
        Ok(path)
    }
}

/// Fire-and-forget handle to a spawned `TraceWriter`.
#[derive(Clone)]
pub struct TraceSink {
    tx: mpsc::UnboundedSender<TraceRecord>,
}

impl TraceSink {
    pub fn record(&self, record: TraceRecord) {
        if self.tx.send(record).is_err() {
            tracing::debug!("[TraceWriter] Writer task has stopped; dropping record");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceWriteError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}
