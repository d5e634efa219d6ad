//! Full-screen terminal UI.
//!
//! Elm-style: terminal keys and spinner ticks arrive as `UiMsg`s, `update`
//! turns them into orchestrator events, and `ui::draw` renders the session
//! whenever something changed.

pub mod app;
pub mod event_loop;
pub mod ui;
pub mod update;

pub use event_loop::run;
