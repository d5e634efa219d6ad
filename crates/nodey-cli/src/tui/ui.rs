use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use nodey_core::artifact::display_name;
use nodey_core::session::LogEntry;
use nodey_core::{Mode, SessionState};

use crate::opener::file_url;
use crate::theme::Theme;

use super::app::App;

pub fn draw(frame: &mut Frame, app: &App, session: &SessionState) {
    let theme = Theme::default();
    let area = frame.area();

    let log = session.log_window(app.log_window);
    let log_height = (log.iter().map(|e| e.to_string().lines().count()).sum::<usize>() as u16)
        .min(area.height.saturating_sub(8));

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(log_height),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .split(area);

    render_title(frame, chunks[0], session, &theme);
    render_log(frame, chunks[1], log, &theme);
    render_content(frame, chunks[2], app, session, &theme);
    render_footer(frame, chunks[3], session.mode, &theme);
}

fn render_title(frame: &mut Frame, area: Rect, session: &SessionState, theme: &Theme) {
    let mut spans = vec![Span::styled(" nodey ", theme.title)];
    if let Some(baseline) = &session.baseline {
        spans.push(Span::styled(
            format!("[Editing {}]", display_name(&baseline.source)),
            theme.agent,
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_log(frame: &mut Frame, area: Rect, log: &[LogEntry], theme: &Theme) {
    let lines: Vec<Line<'static>> = log
        .iter()
        .flat_map(|entry| {
            let style = theme.actor(entry.actor);
            entry
                .to_string()
                .lines()
                .map(|line| Line::from(Span::styled(line.to_string(), style)))
                .collect::<Vec<_>>()
        })
        .collect();
    let scroll = (lines.len() as u16).saturating_sub(area.height);
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), area);
}

fn render_content(frame: &mut Frame, area: Rect, app: &App, session: &SessionState, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border);
    let lines = content_lines(app, session, theme);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn content_lines(app: &App, session: &SessionState, theme: &Theme) -> Vec<Line<'static>> {
    let working = |label: String| {
        vec![Line::from(vec![
            Span::styled(format!("{} ", app.spinner_frame()), theme.agent),
            Span::styled(label, theme.muted.add_modifier(Modifier::ITALIC)),
        ])]
    };
    let editor = || {
        Line::from(vec![
            Span::styled("> ", theme.selected),
            Span::styled(app.input.clone(), theme.input),
            Span::styled("▏", theme.muted),
        ])
    };

    match session.mode {
        Mode::AwaitingInput => {
            let prompt = if session.baseline.is_some() {
                "Describe the changes to make:"
            } else {
                "Describe the process to chart:"
            };
            let mut lines = vec![Line::from(Span::styled(prompt, theme.muted)), Line::default(), editor()];
            if let Some(error) = &session.last_error {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(error.clone(), theme.error)));
            }
            lines
        }
        Mode::AwaitingHistorySelection => {
            let mut lines = vec![
                Line::from(Span::styled("Select a flowchart to edit:", theme.muted)),
                Line::default(),
            ];
            for (i, path) in session.history_entries.iter().enumerate() {
                let name = display_name(path);
                lines.push(if i == session.history_cursor {
                    Line::from(Span::styled(format!("> {}", name), theme.selected))
                } else {
                    Line::from(Span::styled(format!("  {}", name), theme.input))
                });
            }
            lines
        }
        Mode::Analyzing => working("Analyst is thinking...".to_string()),
        Mode::AwaitingAnswer => {
            let question = session.current_question().unwrap_or_default().to_string();
            let progress = format!(" ({}/{})", session.answer_index + 1, session.open_questions.len());
            vec![
                Line::from(Span::styled("Agent needs clarification:", theme.muted)),
                Line::default(),
                Line::from(vec![
                    Span::styled(question, theme.agent),
                    Span::styled(progress, theme.muted),
                ]),
                Line::default(),
                editor(),
            ]
        }
        Mode::Researching => working("Researcher is gathering data...".to_string()),
        Mode::Drafting => working(if session.revision_count > 0 {
            format!(
                "Architect (Revision {}) is designing the layout...",
                session.revision_count
            )
        } else {
            "Architect is designing the layout...".to_string()
        }),
        Mode::Reviewing => working("Judges are reviewing the draft...".to_string()),
        Mode::Emitting => working("Generating HTML artifact...".to_string()),
        Mode::Done => match &session.artifact {
            Some(path) => {
                let mut lines = vec![Line::from(Span::styled("Flowchart ready.", theme.success))];
                if session.forced_approval {
                    lines.push(Line::from(Span::styled(
                        "Approved after reaching the revision limit.",
                        theme.muted,
                    )));
                }
                lines.extend([
                    Line::default(),
                    Line::from(Span::styled("File saved to:", theme.muted)),
                    Line::from(Span::styled(path.display().to_string(), theme.input)),
                    Line::default(),
                    Line::from(Span::styled(
                        file_url(path),
                        theme.agent.add_modifier(Modifier::UNDERLINED),
                    )),
                ]);
                lines
            }
            None => vec![Line::from(Span::styled("Done.", theme.success))],
        },
    }
}

fn render_footer(frame: &mut Frame, area: Rect, mode: Mode, theme: &Theme) {
    let hints = match mode {
        Mode::AwaitingInput => "enter submit · ctrl+l load saved · esc clear · ctrl+c quit",
        Mode::AwaitingAnswer => "enter answer · esc clear · ctrl+c quit",
        Mode::AwaitingHistorySelection => "↑/↓ move · enter edit · o open · esc back · q quit",
        Mode::Done => "o open in browser · n new flowchart · q quit",
        _ => "working · q quit",
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(format!(" {}", hints), theme.muted))),
        area,
    );
}
