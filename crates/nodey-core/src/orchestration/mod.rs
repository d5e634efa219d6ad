//! Orchestrator — the workflow state machine.
//!
//! A deterministic transition function over `SessionState`:
//!
//! ```text
//! AwaitingInput ──submit──► Analyzing ──valid──────────────► Researching
//!      ▲   │                   │  needs_info                     │
//!      │   └─browse─► AwaitingHistorySelection   ▼               ▼
//!      │                            AwaitingAnswer ──last──► Drafting ◄──┐
//!      │                                                        │      rejected
//!      │                                                        ▼       (≤ cap)
//!      └──────────── errors ─────────────────────────────── Reviewing ───┘
//!                                                               │ approved / forced
//!                                                               ▼
//!                                                  Emitting ──► Done
//! ```
//!
//! Each transition appends exactly one log entry and returns at most one
//! effect. While a call is outstanding the machine only accepts the result
//! event answering that call; everything else is ignored.

pub mod event;
pub mod policy;

use std::sync::Arc;

use crate::artifact::history::rendering_path;
use crate::session::{Actor, Baseline, LogEntry, Mode, SessionState};
use crate::steps::{StepError, StepKind, VerdictStatus};

pub use event::{Call, CallKind, Effect, Event};
pub use policy::{FailurePolicy, FailureReaction, PolicyTable};

pub const DEFAULT_REVISION_CAP: u32 = 3;

/// Report handed to the architect when research degraded.
pub const RESEARCH_PLACEHOLDER: &str =
    "Research unavailable; proceed from the requirements alone.";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Rejections tolerated before the current draft is force-accepted.
    pub revision_cap: u32,
    pub policies: PolicyTable,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            revision_cap: DEFAULT_REVISION_CAP,
            policies: PolicyTable::default(),
        }
    }
}

/// Outcome of applying one event.
#[derive(Debug)]
pub struct Transition {
    pub session: SessionState,
    pub effect: Option<Effect>,
}

/// Apply `event` to `session`, returning the next session and any effect.
pub fn transition(mut session: SessionState, event: Event, config: &OrchestratorConfig) -> Transition {
    let effect = apply(&mut session, event, config);
    if let Some(Effect::Dispatch(call)) = &effect {
        session.outstanding = Some(call.kind());
    }
    Transition { session, effect }
}

/// Owns the session and feeds it through `transition`.
pub struct Orchestrator {
    session: SessionState,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_session(SessionState::new(), config)
    }

    pub fn with_session(session: SessionState, config: OrchestratorConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    /// True while a dispatched call has not reported back.
    pub fn is_busy(&self) -> bool {
        self.session.outstanding.is_some()
    }

    pub fn handle(&mut self, event: Event) -> Option<Effect> {
        let session = std::mem::take(&mut self.session);
        let Transition { session, effect } = transition(session, event, &self.config);
        self.session = session;
        effect
    }
}

fn apply(s: &mut SessionState, event: Event, config: &OrchestratorConfig) -> Option<Effect> {
    match (event.answers(), s.outstanding) {
        (Some(answers), Some(awaited)) if answers == awaited => s.outstanding = None,
        (Some(_), _) => {
            tracing::debug!(
                "[Orchestrator] Ignoring {} in {} (awaiting {:?})",
                event.name(),
                s.mode,
                s.outstanding
            );
            return None;
        }
        (None, Some(_)) => {
            tracing::debug!("[Orchestrator] Busy; ignoring {} in {}", event.name(), s.mode);
            return None;
        }
        (None, None) => {}
    }

    let from = s.mode;
    let effect = match (s.mode, event) {
        // ── AwaitingInput ───────────────────────────────────────────────
        (Mode::AwaitingInput, Event::Submit(text)) => submit(s, &text),
        (Mode::AwaitingInput, Event::BrowseHistory) => Some(Effect::Dispatch(Call::ListHistory)),
        (Mode::AwaitingInput, Event::HistoryListed(Ok(entries))) => {
            if entries.is_empty() {
                enter(s, Mode::AwaitingInput, Actor::System, "No saved flowcharts found.");
            } else {
                let count = entries.len();
                s.history_entries = entries;
                s.history_cursor = 0;
                enter(
                    s,
                    Mode::AwaitingHistorySelection,
                    Actor::System,
                    format!("Select a saved flowchart to edit ({} found).", count),
                );
            }
            None
        }
        (Mode::AwaitingInput, Event::HistoryListed(Err(e))) => {
            fail(s, Actor::System, format!("Could not list saved flowcharts: {}", e));
            None
        }

        // ── AwaitingHistorySelection ────────────────────────────────────
        (Mode::AwaitingHistorySelection, Event::CursorUp) => {
            s.history_cursor = s.history_cursor.saturating_sub(1);
            None
        }
        (Mode::AwaitingHistorySelection, Event::CursorDown) => {
            if s.history_cursor + 1 < s.history_entries.len() {
                s.history_cursor += 1;
            }
            None
        }
        (Mode::AwaitingHistorySelection, Event::Highlight(index)) => {
            if index < s.history_entries.len() {
                s.history_cursor = index;
            }
            None
        }
        (Mode::AwaitingHistorySelection, Event::OpenArtifact) => s
            .highlighted_history()
            .map(|path| Effect::Open(rendering_path(path))),
        (Mode::AwaitingHistorySelection, Event::ConfirmSelection) => s
            .highlighted_history()
            .cloned()
            .map(|path| Effect::Dispatch(Call::LoadBaseline(path))),
        (Mode::AwaitingHistorySelection, Event::CancelSelection) => {
            enter(s, Mode::AwaitingInput, Actor::System, "Selection cancelled.");
            None
        }
        (Mode::AwaitingHistorySelection, Event::BaselineLoaded { path, result }) => {
            match result {
                Ok(diagram) => {
                    let message = format!("Loaded {}. Enter changes below:", path.display());
                    s.baseline = Some(Baseline {
                        source: path,
                        diagram: Arc::new(diagram),
                    });
                    enter(s, Mode::AwaitingInput, Actor::System, message);
                }
                Err(e) => fail(s, Actor::System, format!("Failed to load {}: {}", path.display(), e)),
            }
            None
        }

        // ── Analyzing ───────────────────────────────────────────────────
        (Mode::Analyzing, Event::Analyzed(Ok(verdict))) => match verdict.status {
            VerdictStatus::Valid => {
                s.analysis_summary = verdict.summary;
                s.requirements_summary = join(&s.request, &s.analysis_summary);
                let message = format!("Request is valid. {}", s.analysis_summary);
                enter(s, Mode::Researching, Actor::Analyst, message.trim_end());
                Some(research(s, s.request.clone()))
            }
            VerdictStatus::NeedsInfo => {
                s.analysis_summary = verdict.summary;
                s.open_questions = verdict.questions;
                s.answer_index = 0;
                s.collected_answers.clear();
                if s.open_questions.is_empty() {
                    s.requirements_summary = join(&s.request, &s.analysis_summary);
                    let message = format!("Need info - {} (no questions asked)", verdict.reason);
                    enter(s, Mode::Researching, Actor::Analyst, message);
                    Some(research(s, s.request.clone()))
                } else {
                    enter(
                        s,
                        Mode::AwaitingAnswer,
                        Actor::Analyst,
                        format!("Need info - {}", verdict.reason),
                    );
                    None
                }
            }
            VerdictStatus::Invalid => {
                fail_with(
                    s,
                    Actor::Analyst,
                    format!("Rejected - {}", verdict.reason),
                    format!("Analyst rejected: {}", verdict.reason),
                );
                None
            }
        },
        (Mode::Analyzing, Event::Analyzed(Err(e))) => match config.policies.reaction(StepKind::Analyze) {
            FailureReaction::Abort => {
                fail(s, Actor::Error, format!("Analysis failed: {}", e));
                None
            }
            FailureReaction::Degrade | FailureReaction::Accept => {
                s.requirements_summary = s.request.clone();
                let message = format!("analysis unavailable ({}); treating request as valid.", e);
                enter(s, Mode::Researching, Actor::Analyst, message);
                Some(research(s, s.request.clone()))
            }
        },

        // ── AwaitingAnswer ──────────────────────────────────────────────
        (Mode::AwaitingAnswer, Event::Submit(text)) => answer(s, &text),

        // ── Researching ─────────────────────────────────────────────────
        (Mode::Researching, Event::Researched(Ok(report))) => {
            s.research_report = report;
            enter(s, Mode::Drafting, Actor::Researcher, "Found relevant patterns and data.");
            Some(draft(s))
        }
        (Mode::Researching, Event::Researched(Err(e))) => match config.policies.reaction(StepKind::Research) {
            FailureReaction::Abort => {
                fail(s, Actor::Error, format!("Research failed: {}", e));
                None
            }
            FailureReaction::Degrade | FailureReaction::Accept => {
                s.research_report = RESEARCH_PLACEHOLDER.to_string();
                let message = format!("research unavailable ({}); continuing without it.", e);
                enter(s, Mode::Drafting, Actor::Researcher, message);
                Some(draft(s))
            }
        },

        // ── Drafting ────────────────────────────────────────────────────
        (Mode::Drafting, Event::Drafted(Ok(diagram))) => {
            if !diagram.has_minimum_nodes() {
                let violation = StepError::Structure(format!(
                    "drafted flow has {} node(s), at least 2 required",
                    diagram.nodes.len()
                ));
                fail(s, Actor::Architect, format!("Draft rejected - {}", violation));
                None
            } else {
                let message = if s.revision_count > 0 {
                    format!(
                        "Drafted flow with {} nodes (revision {}).",
                        diagram.nodes.len(),
                        s.revision_count
                    )
                } else {
                    format!("Drafted flow with {} nodes.", diagram.nodes.len())
                };
                s.diagram = diagram;
                enter(s, Mode::Reviewing, Actor::Architect, message);
                Some(Effect::Dispatch(Call::Review {
                    diagram: s.diagram.clone(),
                    requirements: s.requirements_summary.clone(),
                }))
            }
        }
        // Draft has no placeholder result, so every policy ends the attempt.
        (Mode::Drafting, Event::Drafted(Err(e))) => {
            fail(s, Actor::Architect, format!("Draft failed - {}", e));
            None
        }

        // ── Reviewing ───────────────────────────────────────────────────
        (Mode::Reviewing, Event::Reviewed(Ok(ruling))) => {
            if ruling.approved {
                enter(s, Mode::Emitting, Actor::Judges, "Unanimous Approval.");
                return finish(s, from, Some(emit(s)));
            }
            s.revision_count += 1;
            if s.revision_count > config.revision_cap {
                s.forced_approval = true;
                let message = format!(
                    "Forced approval after max revisions ({} rejections).",
                    s.revision_count
                );
                enter(s, Mode::Emitting, Actor::Judges, message);
                Some(emit(s))
            } else {
                let feedback = join(&ruling.critique, &ruling.dissent);
                s.pending_feedback = Some(feedback);
                enter(
                    s,
                    Mode::Drafting,
                    Actor::Judges,
                    format!("Critique - {}. Sending back to Architect.", ruling.critique),
                );
                Some(draft(s))
            }
        }
        (Mode::Reviewing, Event::Reviewed(Err(e))) => match config.policies.reaction(StepKind::Review) {
            FailureReaction::Abort => {
                fail(s, Actor::Error, format!("Review failed: {}", e));
                None
            }
            FailureReaction::Accept | FailureReaction::Degrade => {
                let message = format!("review unavailable ({}); approving by default.", e);
                enter(s, Mode::Emitting, Actor::Judges, message);
                Some(emit(s))
            }
        },

        // ── Emitting ────────────────────────────────────────────────────
        (Mode::Emitting, Event::Emitted(Ok(path))) => {
            let message = format!("Success! Saved to {}", path.display());
            s.artifact = Some(path);
            enter(s, Mode::Done, Actor::Generator, message);
            None
        }
        (Mode::Emitting, Event::Emitted(Err(e))) => {
            fail(s, Actor::Generator, format!("Failed - {}", e));
            None
        }

        // ── Done ────────────────────────────────────────────────────────
        (Mode::Done, Event::OpenArtifact) => s.artifact.clone().map(Effect::Open),
        (Mode::Done, Event::StartOver) => {
            start_over(s);
            None
        }
        (Mode::Done, Event::Submit(text)) => {
            if text.trim().is_empty() {
                return None;
            }
            start_over(s);
            submit(s, &text)
        }

        (mode, event) => {
            tracing::debug!("[Orchestrator] {} has no effect in {}", event.name(), mode);
            None
        }
    };

    finish(s, from, effect)
}

fn finish(s: &SessionState, from: Mode, effect: Option<Effect>) -> Option<Effect> {
    if s.mode != from {
        tracing::info!("[Orchestrator] {} -> {}", from, s.mode);
    }
    effect
}

fn submit(s: &mut SessionState, text: &str) -> Option<Effect> {
    let request = text.trim();
    if request.is_empty() {
        return None;
    }
    s.reset_attempt();
    s.request = request.to_string();
    enter(s, Mode::Analyzing, Actor::User, request);
    Some(Effect::Dispatch(Call::Analyze {
        request: s.request.clone(),
        log: s.log_lines(),
    }))
}

fn answer(s: &mut SessionState, text: &str) -> Option<Effect> {
    let answer = text.trim();
    if answer.is_empty() {
        return None;
    }
    let question = s.current_question().unwrap_or_default().to_string();
    s.collected_answers.push(answer.to_string());
    s.answer_index += 1;
    let entry = format!("Q: {}\nA: {}", question, answer);

    if s.answer_index < s.open_questions.len() {
        enter(s, Mode::AwaitingAnswer, Actor::User, entry);
        return None;
    }

    let augmented = join(&s.request, &s.collected_answers.join(" "));
    s.requirements_summary = join(&augmented, &s.analysis_summary);
    enter(s, Mode::Researching, Actor::User, entry);
    Some(research(s, augmented))
}

fn start_over(s: &mut SessionState) {
    s.reset_attempt();
    s.baseline = None;
    enter(s, Mode::AwaitingInput, Actor::System, "Starting a new flowchart.");
}

fn research(s: &SessionState, topic: String) -> Effect {
    Effect::Dispatch(Call::Research {
        topic,
        log: s.log_lines(),
    })
}

fn draft(s: &SessionState) -> Effect {
    let requirements = match &s.pending_feedback {
        Some(feedback) => format!("{}. Feedback: {}", s.requirements_summary, feedback),
        None => s.requirements_summary.clone(),
    };
    Effect::Dispatch(Call::Draft {
        requirements,
        report: s.research_report.clone(),
        baseline: s.baseline_diagram(),
    })
}

fn emit(s: &SessionState) -> Effect {
    Effect::Dispatch(Call::Emit(s.diagram.clone()))
}

/// Successful transition: one log entry, error slot cleared.
fn enter(s: &mut SessionState, mode: Mode, actor: Actor, message: impl Into<String>) {
    s.mode = mode;
    s.last_error = None;
    s.log.push(LogEntry::new(actor, message));
}

/// Recoverable failure: back to AwaitingInput with the error recorded.
fn fail(s: &mut SessionState, actor: Actor, message: String) {
    fail_with(s, actor, message.clone(), message);
}

fn fail_with(s: &mut SessionState, actor: Actor, message: String, error: String) {
    tracing::warn!("[Orchestrator] {} failed in {}: {}", actor.label(), s.mode, error);
    s.mode = Mode::AwaitingInput;
    s.last_error = Some(error);
    s.log.push(LogEntry::new(actor, message));
}

fn join(head: &str, tail: &str) -> String {
    match (head.trim(), tail.trim()) {
        (h, "") => h.to_string(),
        ("", t) => t.to_string(),
        (h, t) => format!("{} {}", h, t),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::models::{Diagram, Node, NodeKind};
    use crate::steps::{Ruling, Verdict};

    fn diagram(count: usize) -> Diagram {
        let nodes = (0..count)
            .map(|i| {
                let kind = if i == 0 { NodeKind::Start } else { NodeKind::Action };
                Node::new(format!("n{}", i), kind, format!("Step {}", i))
            })
            .collect();
        Diagram {
            nodes,
            ..Diagram::default()
        }
    }

    fn verdict(status: VerdictStatus, questions: &[&str]) -> Verdict {
        Verdict {
            status,
            reason: "Too vague".to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
            summary: "Order handling".to_string(),
        }
    }

    fn dispatched(effect: Option<Effect>) -> Call {
        match effect {
            Some(Effect::Dispatch(call)) => call,
            other => panic!("expected dispatch, got {:?}", other),
        }
    }

    /// Drive a fresh orchestrator up to the first Review call.
    fn to_reviewing(orch: &mut Orchestrator) {
        orch.handle(Event::Submit("Order flow".to_string()));
        orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::Valid, &[]))));
        orch.handle(Event::Researched(Ok("patterns".to_string())));
        orch.handle(Event::Drafted(Ok(diagram(3))));
        assert_eq!(orch.mode(), Mode::Reviewing);
    }

    #[test]
    fn test_happy_path_reaches_done() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());

        let call = dispatched(orch.handle(Event::Submit("Order flow".to_string())));
        assert!(matches!(call, Call::Analyze { ref request, .. } if request == "Order flow"));
        assert_eq!(orch.mode(), Mode::Analyzing);

        let call = dispatched(orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::Valid, &[])))));
        assert!(matches!(call, Call::Research { ref topic, .. } if topic == "Order flow"));

        let call = dispatched(orch.handle(Event::Researched(Ok("patterns".to_string()))));
        match call {
            Call::Draft {
                requirements,
                report,
                baseline,
            } => {
                assert_eq!(requirements, "Order flow Order handling");
                assert_eq!(report, "patterns");
                assert!(baseline.is_none());
            }
            other => panic!("unexpected call {:?}", other),
        }

        let call = dispatched(orch.handle(Event::Drafted(Ok(diagram(3)))));
        assert!(matches!(call, Call::Review { ref diagram, .. } if diagram.nodes.len() == 3));

        let call = dispatched(orch.handle(Event::Reviewed(Ok(Ruling::approve()))));
        assert!(matches!(call, Call::Emit(_)));

        let effect = orch.handle(Event::Emitted(Ok(PathBuf::from("order_flow.html"))));
        assert!(effect.is_none());
        assert_eq!(orch.mode(), Mode::Done);

        let session = orch.session();
        assert_eq!(session.log.len(), 6);
        assert_eq!(session.log[0].to_string(), "User: Order flow");
        assert_eq!(session.log[4].to_string(), "Judges: Unanimous Approval.");
        assert_eq!(
            session.log[5].to_string(),
            "Generator: Success! Saved to order_flow.html"
        );
        assert_eq!(session.revision_count, 0);
        assert!(!session.forced_approval);
        assert!(session.last_error.is_none());
    }

    #[test]
    fn test_each_transition_appends_one_entry() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        let events = vec![
            Event::Submit("Order flow".to_string()),
            Event::Analyzed(Ok(verdict(VerdictStatus::Valid, &[]))),
            Event::Researched(Ok("patterns".to_string())),
            Event::Drafted(Ok(diagram(2))),
            Event::Reviewed(Ok(Ruling::reject("Missing end", ""))),
            Event::Drafted(Ok(diagram(3))),
            Event::Reviewed(Ok(Ruling::approve())),
            Event::Emitted(Ok(PathBuf::from("x.html"))),
        ];
        for (i, event) in events.into_iter().enumerate() {
            orch.handle(event);
            assert_eq!(orch.session().log.len(), i + 1);
        }
    }

    #[test]
    fn test_clarification_visits_each_question() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        let effect = orch.handle(Event::Analyzed(Ok(verdict(
            VerdictStatus::NeedsInfo,
            &["What triggers it?", "Who approves?"],
        ))));
        assert!(effect.is_none());
        assert_eq!(orch.mode(), Mode::AwaitingAnswer);
        assert_eq!(orch.session().current_question(), Some("What triggers it?"));

        // Blank answers do nothing.
        assert!(orch.handle(Event::Submit("   ".to_string())).is_none());
        assert_eq!(orch.session().answer_index, 0);

        assert!(orch.handle(Event::Submit("A web order".to_string())).is_none());
        assert_eq!(orch.mode(), Mode::AwaitingAnswer);

        let call = dispatched(orch.handle(Event::Submit("A manager".to_string())));
        match call {
            Call::Research { topic, .. } => assert_eq!(topic, "Order flow A web order A manager"),
            other => panic!("unexpected call {:?}", other),
        }
        let session = orch.session();
        assert_eq!(session.mode, Mode::Researching);
        assert_eq!(
            session.requirements_summary,
            "Order flow A web order A manager Order handling"
        );
        assert_eq!(
            session.log.last().map(ToString::to_string).as_deref(),
            Some("Q: Who approves?\nA: A manager")
        );
    }

    #[test]
    fn test_needs_info_without_questions_goes_to_research() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        let call = dispatched(orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::NeedsInfo, &[])))));
        assert!(matches!(call, Call::Research { .. }));
        assert_eq!(orch.mode(), Mode::Researching);
    }

    #[test]
    fn test_invalid_request_returns_to_input() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("asdf".to_string()));
        let effect = orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::Invalid, &[]))));
        assert!(effect.is_none());
        let session = orch.session();
        assert_eq!(session.mode, Mode::AwaitingInput);
        assert_eq!(session.last_error.as_deref(), Some("Analyst rejected: Too vague"));
        assert_eq!(
            session.log.last().map(ToString::to_string).as_deref(),
            Some("Analyst: Rejected - Too vague")
        );
    }

    #[test]
    fn test_rejections_force_approval_past_cap() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        to_reviewing(&mut orch);

        let mut drafts = 1;
        for i in 1..=3 {
            let call = dispatched(orch.handle(Event::Reviewed(Ok(Ruling::reject(
                format!("issue {}", i),
                "one judge disagrees",
            )))));
            match call {
                Call::Draft { requirements, .. } => assert_eq!(
                    requirements,
                    format!(
                        "Order flow Order handling. Feedback: issue {} one judge disagrees",
                        i
                    )
                ),
                other => panic!("unexpected call {:?}", other),
            }
            let call = dispatched(orch.handle(Event::Drafted(Ok(diagram(3)))));
            // Review always judges against the base requirements.
            assert!(matches!(call, Call::Review { ref requirements, .. } if requirements == "Order flow Order handling"));
            drafts += 1;
        }

        let call = dispatched(orch.handle(Event::Reviewed(Ok(Ruling::reject("still bad", "")))));
        assert!(matches!(call, Call::Emit(_)));
        assert_eq!(drafts, 4);

        let session = orch.session();
        assert_eq!(session.mode, Mode::Emitting);
        assert_eq!(session.revision_count, 4);
        assert!(session.forced_approval);
        assert!(session
            .log
            .last()
            .map(|e| e.message.starts_with("Forced approval"))
            .unwrap_or(false));
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        let before = orch.session().log.len();

        assert!(orch.handle(Event::Drafted(Ok(diagram(3)))).is_none());
        assert!(orch.handle(Event::Reviewed(Ok(Ruling::approve()))).is_none());
        assert_eq!(orch.mode(), Mode::Analyzing);
        assert_eq!(orch.session().log.len(), before);
        assert!(orch.is_busy());
    }

    #[test]
    fn test_user_events_ignored_while_busy() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        assert!(orch.handle(Event::Submit("Another".to_string())).is_none());
        assert!(orch.handle(Event::BrowseHistory).is_none());
        assert_eq!(orch.session().request, "Order flow");
        assert_eq!(orch.session().log.len(), 1);
    }

    #[test]
    fn test_review_failure_fails_open() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        to_reviewing(&mut orch);
        let call = dispatched(orch.handle(Event::Reviewed(Err(StepError::Transport(
            "connection reset".to_string(),
        )))));
        assert!(matches!(call, Call::Emit(_)));
        assert_eq!(orch.mode(), Mode::Emitting);
        assert!(!orch.session().forced_approval);
    }

    #[test]
    fn test_review_failure_can_fail_fast() {
        let config = OrchestratorConfig {
            policies: PolicyTable::default().with(StepKind::Review, FailurePolicy::FailFast),
            ..OrchestratorConfig::default()
        };
        let mut orch = Orchestrator::new(config);
        to_reviewing(&mut orch);
        let effect = orch.handle(Event::Reviewed(Err(StepError::Schema("no json".to_string()))));
        assert!(effect.is_none());
        assert_eq!(orch.mode(), Mode::AwaitingInput);
        assert!(orch.session().last_error.is_some());
    }

    #[test]
    fn test_research_failure_degrades() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::Valid, &[]))));
        let call = dispatched(orch.handle(Event::Researched(Err(StepError::Timeout {
            after: std::time::Duration::from_secs(180),
        }))));
        match call {
            Call::Draft { report, .. } => assert_eq!(report, RESEARCH_PLACEHOLDER),
            other => panic!("unexpected call {:?}", other),
        }
        let session = orch.session();
        assert_eq!(session.mode, Mode::Drafting);
        assert!(session.last_error.is_none());
        assert!(session
            .log
            .last()
            .map(|e| e.message.contains("timed out after 180s"))
            .unwrap_or(false));
    }

    #[test]
    fn test_analysis_failure_fails_fast() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        orch.handle(Event::Analyzed(Err(StepError::Api {
            status: 401,
            message: "bad key".to_string(),
        })));
        let session = orch.session();
        assert_eq!(session.mode, Mode::AwaitingInput);
        assert_eq!(
            session.last_error.as_deref(),
            Some("Analysis failed: API returned 401: bad key")
        );
    }

    #[test]
    fn test_single_node_draft_is_structural_violation() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::Submit("Order flow".to_string()));
        orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::Valid, &[]))));
        orch.handle(Event::Researched(Ok("patterns".to_string())));
        let effect = orch.handle(Event::Drafted(Ok(diagram(1))));
        assert!(effect.is_none());
        assert_eq!(orch.mode(), Mode::AwaitingInput);
        assert!(orch
            .session()
            .last_error
            .as_deref()
            .map(|e| e.contains("structural violation"))
            .unwrap_or(false));
    }

    #[test]
    fn test_emit_failure_returns_to_input() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        to_reviewing(&mut orch);
        orch.handle(Event::Reviewed(Ok(Ruling::approve())));
        orch.handle(Event::Emitted(Err(StepError::Io("disk full".to_string()))));
        assert_eq!(orch.mode(), Mode::AwaitingInput);
        assert_eq!(
            orch.session().last_error.as_deref(),
            Some("Failed - IO error: disk full")
        );
    }

    #[test]
    fn test_empty_history_stays_in_input() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        let call = dispatched(orch.handle(Event::BrowseHistory));
        assert!(matches!(call, Call::ListHistory));
        orch.handle(Event::HistoryListed(Ok(Vec::new())));
        let session = orch.session();
        assert_eq!(session.mode, Mode::AwaitingInput);
        assert_eq!(
            session.log.last().map(ToString::to_string).as_deref(),
            Some("System: No saved flowcharts found.")
        );
    }

    #[test]
    fn test_history_cursor_and_open() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        orch.handle(Event::BrowseHistory);
        orch.handle(Event::HistoryListed(Ok(vec![
            PathBuf::from("b_20240102_000000_flow.json"),
            PathBuf::from("a_20240101_000000_flow.json"),
        ])));
        assert_eq!(orch.mode(), Mode::AwaitingHistorySelection);

        orch.handle(Event::CursorUp);
        assert_eq!(orch.session().history_cursor, 0);
        orch.handle(Event::CursorDown);
        orch.handle(Event::CursorDown);
        assert_eq!(orch.session().history_cursor, 1);

        match orch.handle(Event::OpenArtifact) {
            Some(Effect::Open(path)) => {
                assert_eq!(path, PathBuf::from("a_20240101_000000_flow.html"))
            }
            other => panic!("unexpected effect {:?}", other),
        }

        orch.handle(Event::CancelSelection);
        assert_eq!(orch.mode(), Mode::AwaitingInput);
        assert!(orch.session().baseline.is_none());
    }

    #[test]
    fn test_baseline_is_shared_across_revisions() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        let path = PathBuf::from("order_20240101_000000_flow.json");
        orch.handle(Event::BrowseHistory);
        orch.handle(Event::HistoryListed(Ok(vec![path.clone()])));
        let call = dispatched(orch.handle(Event::ConfirmSelection));
        assert!(matches!(call, Call::LoadBaseline(ref p) if p == &path));
        orch.handle(Event::BaselineLoaded {
            path: path.clone(),
            result: Ok(diagram(4)),
        });
        assert_eq!(orch.mode(), Mode::AwaitingInput);
        let baseline = orch.session().baseline_diagram().expect("baseline loaded");

        orch.handle(Event::Submit("Add a refund branch".to_string()));
        orch.handle(Event::Analyzed(Ok(verdict(VerdictStatus::Valid, &[]))));
        let first = dispatched(orch.handle(Event::Researched(Ok("patterns".to_string()))));
        orch.handle(Event::Drafted(Ok(diagram(5))));
        let second = dispatched(orch.handle(Event::Reviewed(Ok(Ruling::reject("no refund", "")))));

        for call in [first, second] {
            match call {
                Call::Draft {
                    baseline: Some(seen),
                    ..
                } => assert!(Arc::ptr_eq(&seen, &baseline)),
                other => panic!("unexpected call {:?}", other),
            }
        }
    }

    #[test]
    fn test_failed_baseline_load_reports_error() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        let path = PathBuf::from("broken_flow.json");
        orch.handle(Event::BrowseHistory);
        orch.handle(Event::HistoryListed(Ok(vec![path.clone()])));
        orch.handle(Event::ConfirmSelection);
        orch.handle(Event::BaselineLoaded {
            path,
            result: Err(StepError::Schema("expected value".to_string())),
        });
        let session = orch.session();
        assert_eq!(session.mode, Mode::AwaitingInput);
        assert!(session.baseline.is_none());
        assert!(session.last_error.is_some());
    }

    #[test]
    fn test_start_over_clears_attempt_and_baseline() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        to_reviewing(&mut orch);
        orch.handle(Event::Reviewed(Ok(Ruling::approve())));
        orch.handle(Event::Emitted(Ok(PathBuf::from("x.html"))));
        assert_eq!(orch.mode(), Mode::Done);

        match orch.handle(Event::OpenArtifact) {
            Some(Effect::Open(path)) => assert_eq!(path, PathBuf::from("x.html")),
            other => panic!("unexpected effect {:?}", other),
        }

        let logged = orch.session().log.len();
        orch.handle(Event::StartOver);
        let session = orch.session();
        assert_eq!(session.mode, Mode::AwaitingInput);
        assert!(session.request.is_empty());
        assert!(session.artifact.is_none());
        assert!(session.diagram.nodes.is_empty());
        assert_eq!(session.log.len(), logged + 1);
    }

    #[test]
    fn test_submit_from_done_starts_fresh_attempt() {
        let mut orch = Orchestrator::new(OrchestratorConfig::default());
        to_reviewing(&mut orch);
        orch.handle(Event::Reviewed(Ok(Ruling::approve())));
        orch.handle(Event::Emitted(Ok(PathBuf::from("x.html"))));

        let call = dispatched(orch.handle(Event::Submit("Refund flow".to_string())));
        assert!(matches!(call, Call::Analyze { ref request, .. } if request == "Refund flow"));
        assert_eq!(orch.session().revision_count, 0);
        assert_eq!(orch.mode(), Mode::Analyzing);
    }

    #[test]
    fn test_transition_is_pure_over_session() {
        let config = OrchestratorConfig::default();
        let start = SessionState::new();
        let Transition { session, effect } =
            transition(start.clone(), Event::Submit("Order flow".to_string()), &config);
        assert_eq!(start.mode, Mode::AwaitingInput);
        assert_eq!(session.mode, Mode::Analyzing);
        assert_eq!(session.outstanding, Some(CallKind::Step(StepKind::Analyze)));
        assert!(effect.is_some());
    }
}
