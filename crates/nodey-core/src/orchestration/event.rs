//! The orchestrator's message contract.
//!
//! `Event`s flow in (user actions and worker results), `Effect`s flow out.
//! Result events are told apart by variant, never by inspecting content, so
//! a result can only be applied in the state that awaits that variant.

use std::path::PathBuf;
use std::sync::Arc;

use crate::models::Diagram;
use crate::steps::{Ruling, StepError, StepKind, Verdict};

#[derive(Debug, Clone)]
pub enum Event {
    // ── user ──────────────────────────────────────────────────────────────
    Submit(String),
    BrowseHistory,
    CursorUp,
    CursorDown,
    Highlight(usize),
    ConfirmSelection,
    CancelSelection,
    OpenArtifact,
    StartOver,

    // ── worker results ────────────────────────────────────────────────────
    HistoryListed(Result<Vec<PathBuf>, StepError>),
    BaselineLoaded {
        path: PathBuf,
        result: Result<Diagram, StepError>,
    },
    Analyzed(Result<Verdict, StepError>),
    Researched(Result<String, StepError>),
    Drafted(Result<Diagram, StepError>),
    Reviewed(Result<Ruling, StepError>),
    Emitted(Result<PathBuf, StepError>),
}

impl Event {
    /// The call a result event answers; `None` for user events.
    pub fn answers(&self) -> Option<CallKind> {
        match self {
            Event::HistoryListed(_) => Some(CallKind::ListHistory),
            Event::BaselineLoaded { .. } => Some(CallKind::LoadBaseline),
            Event::Analyzed(_) => Some(CallKind::Step(StepKind::Analyze)),
            Event::Researched(_) => Some(CallKind::Step(StepKind::Research)),
            Event::Drafted(_) => Some(CallKind::Step(StepKind::Draft)),
            Event::Reviewed(_) => Some(CallKind::Step(StepKind::Review)),
            Event::Emitted(_) => Some(CallKind::Step(StepKind::Emit)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit(_) => "submit",
            Event::BrowseHistory => "browse_history",
            Event::CursorUp => "cursor_up",
            Event::CursorDown => "cursor_down",
            Event::Highlight(_) => "highlight",
            Event::ConfirmSelection => "confirm_selection",
            Event::CancelSelection => "cancel_selection",
            Event::OpenArtifact => "open_artifact",
            Event::StartOver => "start_over",
            Event::HistoryListed(_) => "history_listed",
            Event::BaselineLoaded { .. } => "baseline_loaded",
            Event::Analyzed(_) => "analyzed",
            Event::Researched(_) => "researched",
            Event::Drafted(_) => "drafted",
            Event::Reviewed(_) => "reviewed",
            Event::Emitted(_) => "emitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    ListHistory,
    LoadBaseline,
    Step(StepKind),
}

/// One outstanding asynchronous operation.
#[derive(Debug, Clone)]
pub enum Call {
    ListHistory,
    LoadBaseline(PathBuf),
    Analyze {
        request: String,
        log: Vec<String>,
    },
    Research {
        topic: String,
        log: Vec<String>,
    },
    Draft {
        requirements: String,
        report: String,
        baseline: Option<Arc<Diagram>>,
    },
    Review {
        diagram: Diagram,
        requirements: String,
    },
    Emit(Diagram),
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::ListHistory => CallKind::ListHistory,
            Call::LoadBaseline(_) => CallKind::LoadBaseline,
            Call::Analyze { .. } => CallKind::Step(StepKind::Analyze),
            Call::Research { .. } => CallKind::Step(StepKind::Research),
            Call::Draft { .. } => CallKind::Step(StepKind::Draft),
            Call::Review { .. } => CallKind::Step(StepKind::Review),
            Call::Emit(_) => CallKind::Step(StepKind::Emit),
        }
    }

    /// The result event reporting that this call failed with `error`.
    pub fn failed(&self, error: StepError) -> Event {
        match self {
            Call::ListHistory => Event::HistoryListed(Err(error)),
            Call::LoadBaseline(path) => Event::BaselineLoaded {
                path: path.clone(),
                result: Err(error),
            },
            Call::Analyze { .. } => Event::Analyzed(Err(error)),
            Call::Research { .. } => Event::Researched(Err(error)),
            Call::Draft { .. } => Event::Drafted(Err(error)),
            Call::Review { .. } => Event::Reviewed(Err(error)),
            Call::Emit(_) => Event::Emitted(Err(error)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    /// Start the single outstanding call.
    Dispatch(Call),
    /// Open a rendering in the external viewer; nothing is awaited.
    Open(PathBuf),
}
