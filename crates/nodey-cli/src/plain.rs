//! Line-oriented surface for pipes and `--plain`.
//!
//! The same runner as the full-screen UI, prompted with dialoguer. Log
//! entries are printed as they appear. At the request prompt, `/load`
//! browses saved flowcharts and `/quit` exits.

use console::{style, StyledObject};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use nodey_core::artifact::display_name;
use nodey_core::session::{Actor, LogEntry};
use nodey_core::{Event, Mode, Runner};

use crate::opener::{file_url, open_in_viewer};

const LOAD_COMMAND: &str = "/load";
const QUIT_COMMAND: &str = "/quit";

pub async fn run(mut runner: Runner, log_window: usize, initial: Option<String>) -> Result<(), String> {
    let theme = ColorfulTheme::default();
    let mut printed = runner.session().log.len().saturating_sub(log_window);

    if let Some(text) = initial {
        runner.handle(Event::Submit(text));
    }

    loop {
        // Drain results, printing progress as it arrives.
        loop {
            printed = print_new(&runner, printed);
            if !runner.is_busy() {
                break;
            }
            match runner.next_result().await {
                Some(event) => {
                    runner.handle(event);
                }
                None => return Ok(()),
            }
        }

        let event = match runner.mode() {
            Mode::AwaitingInput => {
                let label = if runner.session().baseline.is_some() {
                    "Changes to make"
                } else {
                    "Describe a process (/load, /quit)"
                };
                let text = ask(&theme, label)?;
                match text.trim() {
                    QUIT_COMMAND => break,
                    LOAD_COMMAND => Event::BrowseHistory,
                    _ => Event::Submit(text),
                }
            }
            Mode::AwaitingAnswer => {
                let session = runner.session();
                let question = format!(
                    "{} ({}/{})",
                    session.current_question().unwrap_or_default(),
                    session.answer_index + 1,
                    session.open_questions.len()
                );
                Event::Submit(ask(&theme, &question)?)
            }
            Mode::AwaitingHistorySelection => {
                let names: Vec<String> = runner
                    .session()
                    .history_entries
                    .iter()
                    .map(|p| display_name(p))
                    .collect();
                let choice = Select::with_theme(&theme)
                    .with_prompt("Select a flowchart to edit (esc to cancel)")
                    .items(&names)
                    .default(runner.session().history_cursor)
                    .interact_opt()
                    .map_err(|e| format!("prompt failed: {}", e))?;
                match choice {
                    Some(index) => {
                        runner.handle(Event::Highlight(index));
                        Event::ConfirmSelection
                    }
                    None => Event::CancelSelection,
                }
            }
            Mode::Done => {
                if let Some(path) = &runner.session().artifact {
                    println!("{}", style(file_url(path)).cyan().underlined());
                }
                let choice = Select::with_theme(&theme)
                    .with_prompt("Next")
                    .items(&["Start a new flowchart", "Open in browser", "Quit"])
                    .default(0)
                    .interact_opt()
                    .map_err(|e| format!("prompt failed: {}", e))?;
                match choice {
                    Some(0) => Event::StartOver,
                    Some(1) => Event::OpenArtifact,
                    _ => break,
                }
            }
            // Busy states are drained above.
            _ => continue,
        };

        if let Some(path) = runner.handle(event) {
            open_in_viewer(&path);
        }
    }

    Ok(())
}

fn ask(theme: &ColorfulTheme, prompt: &str) -> Result<String, String> {
    Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| format!("prompt failed: {}", e))
}

fn print_new(runner: &Runner, printed: usize) -> usize {
    let log = &runner.session().log;
    for entry in &log[printed.min(log.len())..] {
        println!("{}", styled(entry));
    }
    log.len()
}

fn styled(entry: &LogEntry) -> StyledObject<String> {
    let text = entry.to_string();
    match entry.actor {
        Actor::User => style(text).bold(),
        Actor::System => style(text).dim(),
        Actor::Generator => style(text).green().bold(),
        Actor::Error => style(text).red().bold(),
        Actor::Analyst | Actor::Researcher | Actor::Architect | Actor::Judges => style(text).cyan(),
    }
}
