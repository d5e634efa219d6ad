use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use nodey_core::config::ConfigOverrides;

/// Nodey — describe a process, get a reviewed flowchart
#[derive(Debug, Parser)]
#[command(
    name = "nodey",
    version,
    about = "Nodey — describe a process, get a reviewed flowchart"
)]
pub struct Cli {
    /// Path to a YAML config file (default: ./nodey.yaml, then the user config dir)
    #[arg(long, env = "NODEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model used for every step
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Rejections tolerated before a draft is force-approved
    #[arg(long)]
    pub revision_cap: Option<u32>,

    /// Per-step timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Directory emitted flowcharts are written to
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Line-oriented prompts instead of the full-screen UI
    #[arg(long)]
    pub plain: bool,

    /// Submit this request immediately.
    /// Example: nodey -p "Customer refund process with manager approval"
    #[arg(short = 'p', long = "prompt")]
    pub prompt: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            revision_cap: self.revision_cap,
            step_timeout_secs: self.timeout_secs,
            out_dir: self.out_dir.clone(),
        }
    }

    /// Full-screen UI only when both ends are a terminal and `--plain` is off.
    pub fn use_tui(&self) -> bool {
        !self.plain && std::io::stdout().is_terminal() && std::io::stdin().is_terminal()
    }
}
