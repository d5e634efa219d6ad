use ratatui::style::{Color, Modifier, Style};

use nodey_core::session::Actor;

#[derive(Debug, Clone)]
pub struct Theme {
    pub border: Style,
    pub title: Style,
    pub muted: Style,
    pub agent: Style,
    pub user: Style,
    pub success: Style,
    pub error: Style,
    pub input: Style,
    pub selected: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border: Style::default().fg(Color::DarkGray),
            title: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            muted: Style::default().fg(Color::DarkGray),
            agent: Style::default().fg(Color::Cyan),
            user: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            success: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            input: Style::default().fg(Color::White),
            selected: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    pub fn actor(&self, actor: Actor) -> Style {
        match actor {
            Actor::User => self.user,
            Actor::System => self.muted,
            Actor::Generator => self.success,
            Actor::Error => self.error,
            Actor::Analyst | Actor::Researcher | Actor::Architect | Actor::Judges => self.agent,
        }
    }
}
