//! Session state — the mutable record of one workflow run.
//!
//! Owned exclusively by the `Orchestrator` and only changed by its
//! transition function. Rendering code reads it, never writes it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Diagram;
use crate::orchestration::CallKind;

/// State-machine state. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    AwaitingInput,
    AwaitingHistorySelection,
    Analyzing,
    AwaitingAnswer,
    Researching,
    Drafting,
    Reviewing,
    Emitting,
    Done,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingInput => "awaiting_input",
            Self::AwaitingHistorySelection => "awaiting_history_selection",
            Self::Analyzing => "analyzing",
            Self::AwaitingAnswer => "awaiting_answer",
            Self::Researching => "researching",
            Self::Drafting => "drafting",
            Self::Reviewing => "reviewing",
            Self::Emitting => "emitting",
            Self::Done => "done",
        }
    }

    /// Whether the surface should offer a text editor in this state.
    pub fn accepts_text(&self) -> bool {
        matches!(self, Self::AwaitingInput | Self::AwaitingAnswer)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User,
    System,
    Analyst,
    Researcher,
    Architect,
    Judges,
    Generator,
    Error,
}

impl Actor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::System => "System",
            Self::Analyst => "Analyst",
            Self::Researcher => "Researcher",
            Self::Architect => "Architect",
            Self::Judges => "Judges",
            Self::Generator => "Generator",
            Self::Error => "Error",
        }
    }
}

/// One human-readable trace line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub actor: Actor,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(actor: Actor, message: impl Into<String>) -> Self {
        Self {
            actor,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actor {
            // Q/A pairs read better without a prefix.
            Actor::User if self.message.starts_with("Q: ") => f.write_str(&self.message),
            _ => write!(f, "{}: {}", self.actor.label(), self.message),
        }
    }
}

/// A previously-saved diagram the user chose to edit.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub source: PathBuf,
    pub diagram: Arc<Diagram>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub mode: Mode,
    pub request: String,
    pub log: Vec<LogEntry>,

    // Clarification sub-loop
    pub open_questions: Vec<String>,
    pub answer_index: usize,
    pub collected_answers: Vec<String>,

    // Accumulated context
    pub analysis_summary: String,
    pub requirements_summary: String,
    pub research_report: String,
    /// Critique folded into the next draft request, if the last review rejected.
    pub pending_feedback: Option<String>,

    pub diagram: Diagram,
    pub baseline: Option<Baseline>,
    pub revision_count: u32,
    pub forced_approval: bool,

    // History browser
    pub history_entries: Vec<PathBuf>,
    pub history_cursor: usize,

    pub artifact: Option<PathBuf>,
    pub last_error: Option<String>,
    /// The single dispatched call whose result has not arrived yet.
    pub outstanding: Option<CallKind>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode: Mode::AwaitingInput,
            request: String::new(),
            log: Vec::new(),
            open_questions: Vec::new(),
            answer_index: 0,
            collected_answers: Vec::new(),
            analysis_summary: String::new(),
            requirements_summary: String::new(),
            research_report: String::new(),
            pending_feedback: None,
            diagram: Diagram::default(),
            baseline: None,
            revision_count: 0,
            forced_approval: false,
            history_entries: Vec::new(),
            history_cursor: 0,
            artifact: None,
            last_error: None,
            outstanding: None,
        }
    }

    /// Clear everything tied to one attempt; the log and baseline survive.
    pub fn reset_attempt(&mut self) {
        self.request.clear();
        self.open_questions.clear();
        self.answer_index = 0;
        self.collected_answers.clear();
        self.analysis_summary.clear();
        self.requirements_summary.clear();
        self.research_report.clear();
        self.pending_feedback = None;
        self.diagram = Diagram::default();
        self.revision_count = 0;
        self.forced_approval = false;
        self.artifact = None;
    }

    pub fn current_question(&self) -> Option<&str> {
        self.open_questions.get(self.answer_index).map(String::as_str)
    }

    pub fn highlighted_history(&self) -> Option<&PathBuf> {
        self.history_entries.get(self.history_cursor)
    }

    pub fn baseline_diagram(&self) -> Option<Arc<Diagram>> {
        self.baseline.as_ref().map(|b| Arc::clone(&b.diagram))
    }

    /// The log as plain strings, the shape step contracts receive.
    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(ToString::to_string).collect()
    }

    /// Last `n` entries, oldest first, for rendering.
    pub fn log_window(&self, n: usize) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(n);
        &self.log[start..]
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_awaiting_input() {
        let session = SessionState::new();
        assert_eq!(session.mode, Mode::AwaitingInput);
        assert!(session.log.is_empty());
        assert_eq!(session.revision_count, 0);
        assert!(session.baseline.is_none());
    }

    #[test]
    fn test_log_window_keeps_order() {
        let mut session = SessionState::new();
        for i in 0..15 {
            session.log.push(LogEntry::new(Actor::System, format!("entry {}", i)));
        }
        let window = session.log_window(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].message, "entry 5");
        assert_eq!(window[9].message, "entry 14");
        assert_eq!(session.log.len(), 15);
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry::new(Actor::Analyst, "Request is valid.");
        assert_eq!(entry.to_string(), "Analyst: Request is valid.");
        let qa = LogEntry::new(Actor::User, "Q: Why?\nA: Because.");
        assert_eq!(qa.to_string(), "Q: Why?\nA: Because.");
    }

    #[test]
    fn test_reset_attempt_keeps_log_and_baseline() {
        let mut session = SessionState::new();
        session.log.push(LogEntry::new(Actor::User, "Order flow"));
        session.request = "Order flow".to_string();
        session.revision_count = 2;
        session.baseline = Some(Baseline {
            source: PathBuf::from("a_flow.json"),
            diagram: Arc::new(Diagram::default()),
        });
        session.reset_attempt();
        assert!(session.request.is_empty());
        assert_eq!(session.revision_count, 0);
        assert_eq!(session.log.len(), 1);
        assert!(session.baseline.is_some());
    }
}
