//! Runtime — executes the orchestrator's effects.
//!
//! ```text
//!  user event ──► Runner::handle ──► Orchestrator ──Effect::Dispatch──► Dispatcher
//!                      ▲                                                   │ tokio::spawn
//!                      └──────────── result Event (mpsc) ◄─────────────────┘
//! ```
//!
//! The orchestrator is only touched from the task that owns the `Runner`,
//! so session state has a single writer. Workers only send result events.

pub mod dispatcher;
pub mod runner;

pub use dispatcher::Dispatcher;
pub use runner::Runner;
