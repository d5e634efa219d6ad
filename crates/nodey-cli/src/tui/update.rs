use crossterm::event::{KeyCode, KeyModifiers};

use nodey_core::{Event, Mode};

use super::app::{App, UiMsg};

/// Apply one UI message; returns the orchestrator event it produced, if any.
/// While `busy`, the editor is frozen so typed text cannot be lost.
pub fn update(app: &mut App, mode: Mode, busy: bool, msg: UiMsg) -> Option<Event> {
    match msg {
        UiMsg::Resize(w, h) => {
            app.width = w;
            app.height = h;
            app.set_dirty();
            None
        }
        UiMsg::AnimTick => {
            if is_working(mode) {
                app.spinner = app.spinner.wrapping_add(1);
                app.set_dirty();
            }
            None
        }
        UiMsg::Key(key) => {
            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl && key.code == KeyCode::Char('c') {
                app.should_quit = true;
                return None;
            }
            app.set_dirty();

            if mode.accepts_text() {
                if busy {
                    return None;
                }
                return edit(app, mode, key.code, ctrl);
            }

            match (mode, key.code) {
                (_, KeyCode::Char('q')) => {
                    app.should_quit = true;
                    None
                }
                (Mode::AwaitingHistorySelection, KeyCode::Up) => Some(Event::CursorUp),
                (Mode::AwaitingHistorySelection, KeyCode::Down) => Some(Event::CursorDown),
                (Mode::AwaitingHistorySelection, KeyCode::Enter) => Some(Event::ConfirmSelection),
                (Mode::AwaitingHistorySelection, KeyCode::Esc) => Some(Event::CancelSelection),
                (Mode::AwaitingHistorySelection | Mode::Done, KeyCode::Char('o')) => {
                    Some(Event::OpenArtifact)
                }
                (Mode::Done, KeyCode::Char('n')) => Some(Event::StartOver),
                _ => None,
            }
        }
    }
}

fn edit(app: &mut App, mode: Mode, code: KeyCode, ctrl: bool) -> Option<Event> {
    match code {
        KeyCode::Char('l') if ctrl && mode == Mode::AwaitingInput => Some(Event::BrowseHistory),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => {
            app.input.push(c);
            None
        }
        KeyCode::Backspace => {
            app.input.pop();
            None
        }
        KeyCode::Esc => {
            app.input.clear();
            None
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                None
            } else {
                Some(Event::Submit(app.take_input()))
            }
        }
        _ => None,
    }
}

pub fn is_working(mode: Mode) -> bool {
    matches!(
        mode,
        Mode::Analyzing | Mode::Researching | Mode::Drafting | Mode::Reviewing | Mode::Emitting
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> UiMsg {
        UiMsg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> UiMsg {
        UiMsg::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn test_typing_and_submit() {
        let mut app = App::new(10);
        for c in "Login q".chars() {
            assert!(update(&mut app, Mode::AwaitingInput, false, key(KeyCode::Char(c))).is_none());
        }
        assert!(!app.should_quit);
        update(&mut app, Mode::AwaitingInput, false, key(KeyCode::Backspace));
        match update(&mut app, Mode::AwaitingInput, false, key(KeyCode::Enter)) {
            Some(Event::Submit(text)) => assert_eq!(text, "Login "),
            other => panic!("unexpected {:?}", other),
        }
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_blank_enter_submits_nothing() {
        let mut app = App::new(10);
        update(&mut app, Mode::AwaitingAnswer, false, key(KeyCode::Char(' ')));
        assert!(update(&mut app, Mode::AwaitingAnswer, false, key(KeyCode::Enter)).is_none());
    }

    #[test]
    fn test_ctrl_l_browses_history_only_from_input() {
        let mut app = App::new(10);
        assert!(matches!(
            update(&mut app, Mode::AwaitingInput, false, ctrl('l')),
            Some(Event::BrowseHistory)
        ));
        assert!(update(&mut app, Mode::AwaitingAnswer, false, ctrl('l')).is_none());
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_history_keys() {
        let mut app = App::new(10);
        let mode = Mode::AwaitingHistorySelection;
        assert!(matches!(update(&mut app, mode, false, key(KeyCode::Up)), Some(Event::CursorUp)));
        assert!(matches!(update(&mut app, mode, false, key(KeyCode::Down)), Some(Event::CursorDown)));
        assert!(matches!(update(&mut app, mode, false, key(KeyCode::Enter)), Some(Event::ConfirmSelection)));
        assert!(matches!(update(&mut app, mode, false, key(KeyCode::Esc)), Some(Event::CancelSelection)));
        assert!(matches!(update(&mut app, mode, false, key(KeyCode::Char('o'))), Some(Event::OpenArtifact)));
    }

    #[test]
    fn test_done_keys_and_quit() {
        let mut app = App::new(10);
        assert!(matches!(update(&mut app, Mode::Done, false, key(KeyCode::Char('n'))), Some(Event::StartOver)));
        assert!(matches!(update(&mut app, Mode::Done, false, key(KeyCode::Char('o'))), Some(Event::OpenArtifact)));
        update(&mut app, Mode::Drafting, false, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_editor_frozen_while_busy() {
        let mut app = App::new(10);
        for c in "Login".chars() {
            update(&mut app, Mode::AwaitingInput, false, key(KeyCode::Char(c)));
        }
        assert!(update(&mut app, Mode::AwaitingInput, true, key(KeyCode::Enter)).is_none());
        assert!(update(&mut app, Mode::AwaitingInput, true, key(KeyCode::Char('x'))).is_none());
        assert_eq!(app.input, "Login");

        match update(&mut app, Mode::AwaitingInput, false, key(KeyCode::Enter)) {
            Some(Event::Submit(text)) => assert_eq!(text, "Login"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let mut app = App::new(10);
        update(&mut app, Mode::AwaitingInput, false, ctrl('c'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_spinner_only_ticks_while_working() {
        let mut app = App::new(10);
        app.dirty = false;
        update(&mut app, Mode::AwaitingInput, false, UiMsg::AnimTick);
        assert!(!app.dirty);
        update(&mut app, Mode::Reviewing, false, UiMsg::AnimTick);
        assert!(app.dirty);
        assert_eq!(app.spinner, 1);
    }
}
