//! Nodey Core — domain logic for turning a natural-language request into a
//! reviewed flowchart artifact.
//!
//! This crate holds everything except the terminal surfaces:
//!
//! - `models` — the `Diagram` graph (nodes, connections, overview)
//! - `session` — the mutable record of one workflow run
//! - `orchestration` — the deterministic state machine driving the run
//! - `steps` — Analyze / Research / Draft / Review contracts and their
//!   LLM-backed implementations
//! - `artifact` — JSON + HTML emitter and the saved-flow history store
//! - `runtime` — worker dispatch and the single-writer event runner
//! - `config` — layered configuration (defaults, YAML, env, flags)
//! - `trace` — optional JSONL mirror of the session log

pub mod artifact;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestration;
pub mod runtime;
pub mod session;
pub mod steps;
pub mod trace;

// Convenience re-exports
pub use config::NodeyConfig;
pub use error::FlowError;
pub use models::{Connection, ConnectionLabel, Diagram, Node, NodeKind, Overview};
pub use orchestration::{Event, Orchestrator};
pub use runtime::Runner;
pub use session::{Mode, SessionState};
