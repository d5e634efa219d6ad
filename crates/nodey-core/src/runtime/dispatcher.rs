//! Runs one `Call` on a worker task and reports its result as an `Event`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::artifact::{ArtifactEmitter, HistoryStore};
use crate::orchestration::{Call, Event, PolicyTable};
use crate::steps::{Agents, DraftRequest, StepError, StepKind};

#[derive(Clone)]
pub struct Dispatcher {
    agents: Agents,
    emitter: Arc<dyn ArtifactEmitter>,
    history: HistoryStore,
    policies: PolicyTable,
    step_timeout: Duration,
    results: mpsc::UnboundedSender<Event>,
}

impl Dispatcher {
    pub fn new(
        agents: Agents,
        emitter: Arc<dyn ArtifactEmitter>,
        history: HistoryStore,
        policies: PolicyTable,
        step_timeout: Duration,
        results: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            agents,
            emitter,
            history,
            policies,
            step_timeout,
            results,
        }
    }

    /// Start `call` on its own task; the result arrives on the event channel.
    /// A panicking step still reports a failure event for the call.
    pub fn dispatch(&self, call: Call) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let worker = this.clone();
            let pending = call.clone();
            let event = match tokio::spawn(async move { worker.run(pending).await }).await {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("[Dispatcher] {:?} worker panicked: {}", call.kind(), e);
                    call.failed(StepError::Io(format!("worker panicked: {}", e)))
                }
            };
            if this.results.send(event).is_err() {
                tracing::debug!("[Dispatcher] Runner is gone; dropping result");
            }
        })
    }

    /// Execute `call` to completion and wrap the outcome.
    pub async fn run(&self, call: Call) -> Event {
        match call {
            Call::ListHistory => {
                let store = self.history.clone();
                Event::HistoryListed(blocking(move || store.list()).await)
            }
            Call::LoadBaseline(path) => {
                let store = self.history.clone();
                let target = path.clone();
                let result = blocking(move || store.load(&target)).await;
                Event::BaselineLoaded { path, result }
            }
            Call::Analyze { request, log } => {
                let analyst = &self.agents.analyst;
                Event::Analyzed(
                    self.attempt(StepKind::Analyze, || analyst.analyze(&request, &log))
                        .await,
                )
            }
            Call::Research { topic, log } => {
                let researcher = &self.agents.researcher;
                Event::Researched(
                    self.attempt(StepKind::Research, || researcher.research(&topic, &log))
                        .await,
                )
            }
            Call::Draft {
                requirements,
                report,
                baseline,
            } => {
                let architect = &self.agents.architect;
                Event::Drafted(
                    self.attempt(StepKind::Draft, || {
                        architect.draft(DraftRequest {
                            requirements: requirements.clone(),
                            report: report.clone(),
                            baseline: baseline.clone(),
                        })
                    })
                    .await,
                )
            }
            Call::Review {
                diagram,
                requirements,
            } => {
                let reviewer = &self.agents.reviewer;
                let result = match serde_json::to_string_pretty(&diagram) {
                    Ok(json) => {
                        self.attempt(StepKind::Review, || reviewer.review(&json, &requirements))
                            .await
                    }
                    Err(e) => Err(StepError::Schema(format!("Failed to serialize diagram: {}", e))),
                };
                Event::Reviewed(result)
            }
            Call::Emit(diagram) => {
                let emitter = &self.emitter;
                Event::Emitted(self.attempt(StepKind::Emit, || emitter.emit(&diagram)).await)
            }
        }
    }

    /// Run `op` under the step timeout, repeating per the step's retry budget.
    async fn attempt<T, F, Fut>(&self, kind: StepKind, mut op: F) -> Result<T, StepError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        let retries = self.policies.get(kind).retries();
        let mut attempt = 0;
        loop {
            tracing::info!("[Dispatcher] {} (attempt {})", kind, attempt + 1);
            let result = match tokio::time::timeout(self.step_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(StepError::Timeout {
                    after: self.step_timeout,
                }),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    tracing::warn!("[Dispatcher] {} failed ({}); retrying", kind, e);
                }
                Err(e) => {
                    tracing::warn!("[Dispatcher] {} failed: {}", kind, e);
                    return Err(e);
                }
            }
        }
    }
}

async fn blocking<T, F>(work: F) -> Result<T, StepError>
where
    F: FnOnce() -> Result<T, StepError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StepError::Io(format!("worker panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::models::{Diagram, Node, NodeKind};
    use crate::orchestration::FailurePolicy;
    use crate::steps::{Analyst, Architect, Researcher, Reviewer, Ruling, Verdict, VerdictStatus};

    /// Fails `failures` times, then succeeds; research sleeps past any timeout.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Analyst for Flaky {
        async fn analyze(&self, _request: &str, _log: &[String]) -> Result<Verdict, StepError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(StepError::Transport("connection reset".to_string()));
            }
            Ok(Verdict {
                status: VerdictStatus::Valid,
                reason: String::new(),
                questions: Vec::new(),
                summary: "ok".to_string(),
            })
        }
    }

    #[async_trait]
    impl Researcher for Flaky {
        async fn research(&self, _topic: &str, _log: &[String]) -> Result<String, StepError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    #[async_trait]
    impl Architect for Flaky {
        async fn draft(&self, _request: DraftRequest) -> Result<Diagram, StepError> {
            Ok(Diagram {
                nodes: vec![
                    Node::new("a", NodeKind::Start, "A"),
                    Node::new("b", NodeKind::End, "B"),
                ],
                ..Diagram::default()
            })
        }
    }

    #[async_trait]
    impl Reviewer for Flaky {
        async fn review(&self, diagram_json: &str, _requirements: &str) -> Result<Ruling, StepError> {
            assert!(diagram_json.contains("\"id\": \"a\""));
            Ok(Ruling::approve())
        }
    }

    fn dispatcher(failures: u32, policies: PolicyTable, dir: &std::path::Path) -> (Dispatcher, Arc<Flaky>) {
        let agent = Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Agents::from_single(agent.clone()),
            Arc::new(crate::artifact::FileEmitter::new(dir)),
            HistoryStore::new(dir),
            policies,
            Duration::from_millis(50),
            tx,
        );
        (dispatcher, agent)
    }

    #[tokio::test]
    async fn test_retry_policy_repeats_call() {
        let dir = tempfile::tempdir().unwrap();
        let policies =
            PolicyTable::default().with(StepKind::Analyze, FailurePolicy::Retry { attempts: 2 });
        let (dispatcher, agent) = dispatcher(2, policies, dir.path());

        let event = dispatcher
            .run(Call::Analyze {
                request: "Order flow".to_string(),
                log: Vec::new(),
            })
            .await;
        assert!(matches!(event, Event::Analyzed(Ok(_))));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_reports_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, agent) = dispatcher(1, PolicyTable::default(), dir.path());
        let event = dispatcher
            .run(Call::Analyze {
                request: "Order flow".to_string(),
                log: Vec::new(),
            })
            .await;
        assert!(matches!(event, Event::Analyzed(Err(StepError::Transport(_)))));
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_becomes_step_error() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, _) = dispatcher(0, PolicyTable::default(), dir.path());
        let event = dispatcher
            .run(Call::Research {
                topic: "Order flow".to_string(),
                log: Vec::new(),
            })
            .await;
        match event {
            Event::Researched(Err(StepError::Timeout { after })) => {
                assert_eq!(after, Duration::from_millis(50))
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_review_receives_diagram_json() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, agent) = dispatcher(0, PolicyTable::default(), dir.path());
        let diagram = agent
            .draft(DraftRequest {
                requirements: String::new(),
                report: String::new(),
                baseline: None,
            })
            .await
            .unwrap();
        let event = dispatcher
            .run(Call::Review {
                diagram,
                requirements: "Order flow".to_string(),
            })
            .await;
        assert!(matches!(event, Event::Reviewed(Ok(ref r)) if r.approved));
    }

    #[tokio::test]
    async fn test_list_history_reports_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("order_flow.json"), "{}").unwrap();
        let (dispatcher, _) = dispatcher(0, PolicyTable::default(), dir.path());
        match dispatcher.run(Call::ListHistory).await {
            Event::HistoryListed(Ok(entries)) => {
                assert_eq!(entries, vec![dir.path().join("order_flow.json")])
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
