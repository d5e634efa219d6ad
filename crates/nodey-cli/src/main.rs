//! `nodey` binary entry point.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use nodey_cli::Cli;
use nodey_core::NodeyConfig;

const DEFAULT_FILTER: &str = "nodey_core=warn,nodey_cli=warn";
const TUI_FILTER: &str = "nodey_core=info,nodey_cli=info";
const TUI_LOG: &str = ".nodey/nodey.log";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let use_tui = cli.use_tui();
    init_tracing(use_tui);

    let config = match NodeyConfig::load(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = nodey_cli::run(config, cli.prompt, use_tui).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// The full-screen UI owns the terminal, so its logs go to a file.
fn init_tracing(use_tui: bool) {
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
    };

    if use_tui {
        let path = Path::new(TUI_LOG);
        let file = path
            .parent()
            .map(std::fs::create_dir_all)
            .transpose()
            .and_then(|_| OpenOptions::new().create(true).append(true).open(path));
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter(TUI_FILTER))
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .init();
            }
            // Without a log file, stay silent rather than draw over the UI.
            Err(_) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter("off"))
                    .with_writer(std::io::sink)
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter(DEFAULT_FILTER))
            .with_writer(std::io::stderr)
            .init();
    }
}
