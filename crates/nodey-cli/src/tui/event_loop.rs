use std::io;

use crossterm::event::{Event as TermEvent, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};

use nodey_core::{Event, Runner};

use crate::opener::open_in_viewer;

use super::app::{App, UiMsg};
use super::ui::draw;
use super::update::update;

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self, String> {
        enable_raw_mode().map_err(|e| format!("enable raw mode: {}", e))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|e| format!("enter alt screen: {}", e))?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal =
            Terminal::new(backend).map_err(|e| format!("create terminal: {}", e))?;
        terminal.clear().map_err(|e| format!("clear terminal: {}", e))?;
        Ok(Self { terminal })
    }

    fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

pub async fn run(mut runner: Runner, log_window: usize, initial: Option<String>) -> Result<(), String> {
    let mut term = TerminalGuard::enter()?;
    let mut app = App::new(log_window);
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMsg>(256);

    // Terminal key/resize events.
    {
        let ui_tx = ui_tx.clone();
        tokio::spawn(async move {
            let mut events = EventStream::new();
            while let Some(Ok(ev)) = events.next().await {
                let msg = match ev {
                    TermEvent::Key(key) if key.kind == KeyEventKind::Press => UiMsg::Key(key),
                    TermEvent::Resize(w, h) => UiMsg::Resize(w, h),
                    _ => continue,
                };
                if ui_tx.send(msg).await.is_err() {
                    break;
                }
            }
        });
    }

    // Spinner tick.
    {
        let ui_tx = ui_tx.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_millis(80));
            loop {
                ticker.tick().await;
                if ui_tx.send(UiMsg::AnimTick).await.is_err() {
                    break;
                }
            }
        });
    }

    let size = term
        .terminal_mut()
        .size()
        .map_err(|e| format!("read terminal size: {}", e))?;
    app.width = size.width;
    app.height = size.height;

    if let Some(text) = initial {
        apply(&mut runner, Event::Submit(text));
    }

    loop {
        if app.dirty {
            term.terminal_mut()
                .draw(|frame| draw(frame, &app, runner.session()))
                .map_err(|e| format!("draw: {}", e))?;
            app.dirty = false;
        }

        tokio::select! {
            msg = ui_rx.recv() => {
                let Some(msg) = msg else { break };
                if let Some(event) = update(&mut app, runner.mode(), runner.is_busy(), msg) {
                    apply(&mut runner, event);
                }
            }
            result = runner.next_result() => {
                let Some(event) = result else { break };
                apply(&mut runner, event);
                app.set_dirty();
            }
        }

        if app.should_quit {
            break;
        }
    }

    tracing::info!("[TUI] Exiting in {}", runner.mode());
    Ok(())
}

fn apply(runner: &mut Runner, event: Event) {
    if let Some(path) = runner.handle(event) {
        open_in_viewer(&path);
    }
}
