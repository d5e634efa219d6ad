//! Nodey CLI — terminal surfaces over `nodey-core`.
//!
//! Two surfaces drive the same `Runner`:
//!
//! - `tui` — full-screen ratatui interface (default on a terminal)
//! - `plain` — dialoguer prompts for pipes, CI logs and `--plain`

pub mod cli;
pub mod opener;
pub mod plain;
pub mod theme;
pub mod tui;

use std::sync::Arc;

use nodey_core::steps::{Agents, ChatClient, LlmAgents};
use nodey_core::{NodeyConfig, Runner};

pub use cli::Cli;

/// Runner backed by the configured reasoning service.
pub fn build_runner(config: &NodeyConfig) -> Runner {
    let client = ChatClient::new(config.provider.clone());
    let agents = LlmAgents::with_prompt_overrides(client, &config.prompts);
    Runner::from_config(config, Agents::from_single(Arc::new(agents)))
}

pub async fn run(config: NodeyConfig, prompt: Option<String>, use_tui: bool) -> Result<(), String> {
    tracing::info!(
        "[CLI] Starting ({} via {}, out_dir={})",
        config.provider.model,
        config.provider.adapter,
        config.out_dir.display()
    );
    let runner = build_runner(&config);
    if use_tui {
        tui::run(runner, config.log_window, prompt).await
    } else {
        plain::run(runner, config.log_window, prompt).await
    }
}
