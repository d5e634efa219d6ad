//! Step contracts — the four reasoning steps the orchestrator depends on.
//!
//! ```text
//! Orchestrator ──► Dispatcher ──► Analyst / Researcher / Architect / Reviewer
//!                                      │
//!                                 ChatClient (HTTP)
//!                                      │
//!                           OpenAI / Anthropic-compatible API
//! ```
//!
//! Each contract is an atomic request/response call with unbounded latency.
//! Implementations validate responses against the closed schemas below and
//! report any mismatch as a `StepError`; partially-populated values never
//! reach the orchestrator.

pub mod chat;
pub mod llm;
pub mod parse;
pub mod specialist;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Diagram;

pub use chat::{ChatClient, ChatConfig};
pub use llm::LlmAgents;
pub use specialist::Specialist;

/// Identifies a dispatched operation, for policy lookup and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Analyze,
    Research,
    Draft,
    Review,
    Emit,
}

impl StepKind {
    pub const ALL: [StepKind; 5] = [
        StepKind::Analyze,
        StepKind::Research,
        StepKind::Draft,
        StepKind::Review,
        StepKind::Emit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Research => "research",
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Emit => "emit",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure outcome of a step call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response shape: {0}")]
    Schema(String),

    #[error("structural violation: {0}")]
    Structure(String),

    #[error("timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("IO error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Valid,
    NeedsInfo,
    Invalid,
}

/// Analyst outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// Reviewer outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ruling {
    pub approved: bool,
    #[serde(default)]
    pub critique: String,
    #[serde(default)]
    pub dissent: String,
}

impl Ruling {
    pub fn approve() -> Self {
        Self {
            approved: true,
            ..Self::default()
        }
    }

    pub fn reject(critique: impl Into<String>, dissent: impl Into<String>) -> Self {
        Self {
            approved: false,
            critique: critique.into(),
            dissent: dissent.into(),
        }
    }
}

/// Input of one Draft call. The baseline is shared, never copied, so every
/// revision of an edit session sees the same value.
#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub requirements: String,
    pub report: String,
    pub baseline: Option<Arc<Diagram>>,
}

#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(&self, request: &str, log: &[String]) -> Result<Verdict, StepError>;
}

#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, topic: &str, log: &[String]) -> Result<String, StepError>;
}

#[async_trait]
pub trait Architect: Send + Sync {
    async fn draft(&self, request: DraftRequest) -> Result<Diagram, StepError>;
}

#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, diagram_json: &str, requirements: &str) -> Result<Ruling, StepError>;
}

/// The full set of step contracts handed to the dispatcher.
#[derive(Clone)]
pub struct Agents {
    pub analyst: Arc<dyn Analyst>,
    pub researcher: Arc<dyn Researcher>,
    pub architect: Arc<dyn Architect>,
    pub reviewer: Arc<dyn Reviewer>,
}

impl Agents {
    /// Use one value for all four roles.
    pub fn from_single<T>(agent: Arc<T>) -> Self
    where
        T: Analyst + Researcher + Architect + Reviewer + 'static,
    {
        Self {
            analyst: agent.clone(),
            researcher: agent.clone(),
            architect: agent.clone(),
            reviewer: agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_status_is_closed() {
        let ok: Verdict = serde_json::from_str(
            r#"{"status": "needs_info", "reason": "Too vague", "questions": ["What triggers the order?"], "summary": "Order"}"#,
        )
        .unwrap();
        assert_eq!(ok.status, VerdictStatus::NeedsInfo);
        assert_eq!(ok.questions.len(), 1);

        let bad = serde_json::from_str::<Verdict>(r#"{"status": "maybe"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_step_error_messages() {
        let err = StepError::Timeout {
            after: Duration::from_secs(180),
        };
        assert_eq!(err.to_string(), "timed out after 180s");
        let err = StepError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "API returned 429: slow down");
    }
}
