use crossterm::event::KeyEvent;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone)]
pub enum UiMsg {
    Key(KeyEvent),
    Resize(u16, u16),
    AnimTick,
}

pub struct App {
    pub dirty: bool,
    pub should_quit: bool,
    /// Text editor buffer for requests and answers.
    pub input: String,
    pub spinner: usize,
    pub log_window: usize,
    pub width: u16,
    pub height: u16,
}

impl App {
    pub fn new(log_window: usize) -> Self {
        Self {
            dirty: true,
            should_quit: false,
            input: String::new(),
            spinner: 0,
            log_window,
            width: 0,
            height: 0,
        }
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner % SPINNER_FRAMES.len()]
    }

    /// Take the editor contents for submission.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }
}
