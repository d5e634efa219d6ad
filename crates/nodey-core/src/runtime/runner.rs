//! Runner — couples the orchestrator, the dispatcher and the result queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::artifact::{ArtifactEmitter, FileEmitter, HistoryStore};
use crate::config::NodeyConfig;
use crate::orchestration::{Effect, Event, Orchestrator, OrchestratorConfig};
use crate::session::{Mode, SessionState};
use crate::steps::Agents;
use crate::trace::{TraceRecord, TraceSink, TraceWriter};

use super::Dispatcher;

pub struct Runner {
    orchestrator: Orchestrator,
    dispatcher: Dispatcher,
    results: mpsc::UnboundedReceiver<Event>,
    trace: Option<TraceSink>,
    /// Log entries already mirrored to tracing and the trace sink.
    seen: usize,
}

impl Runner {
    pub fn new(
        config: OrchestratorConfig,
        agents: Agents,
        emitter: Arc<dyn ArtifactEmitter>,
        history: HistoryStore,
        step_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            agents,
            emitter,
            history,
            config.policies.clone(),
            step_timeout,
            tx,
        );
        Self {
            orchestrator: Orchestrator::new(config),
            dispatcher,
            results: rx,
            trace: None,
            seen: 0,
        }
    }

    /// Runner writing artifacts to `out_dir` and listing `history_dir`.
    /// Must be called inside a tokio runtime when tracing is enabled.
    pub fn from_config(config: &NodeyConfig, agents: Agents) -> Self {
        let runner = Self::new(
            config.orchestrator_config(),
            agents,
            Arc::new(FileEmitter::new(&config.out_dir)),
            HistoryStore::new(&config.history_dir),
            config.step_timeout(),
        );
        if config.trace {
            runner.with_trace(TraceWriter::new(".").spawn())
        } else {
            runner
        }
    }

    pub fn with_trace(mut self, sink: TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn session(&self) -> &SessionState {
        self.orchestrator.session()
    }

    pub fn mode(&self) -> Mode {
        self.orchestrator.mode()
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    /// Apply one event. Dispatches any resulting call and returns the path
    /// the surface should open, if the event asked for one.
    pub fn handle(&mut self, event: Event) -> Option<PathBuf> {
        let effect = self.orchestrator.handle(event);
        self.mirror_log();
        match effect {
            Some(Effect::Dispatch(call)) => {
                self.dispatcher.dispatch(call);
                None
            }
            Some(Effect::Open(path)) => Some(path),
            None => None,
        }
    }

    /// Wait for the next worker result. Cancel-safe.
    pub async fn next_result(&mut self) -> Option<Event> {
        self.results.recv().await
    }

    /// Apply result events until no call is outstanding.
    pub async fn settle(&mut self) {
        while self.is_busy() {
            match self.next_result().await {
                Some(event) => {
                    self.handle(event);
                }
                None => break,
            }
        }
    }

    fn mirror_log(&mut self) {
        let session = self.orchestrator.session();
        for entry in &session.log[self.seen.min(session.log.len())..] {
            tracing::info!("[Session] {}", entry);
            if let Some(sink) = &self.trace {
                sink.record(TraceRecord::from_entry(&session.id, session.mode, entry));
            }
        }
        self.seen = session.log.len();
    }
}
