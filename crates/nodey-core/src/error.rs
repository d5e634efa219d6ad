//! Core error type for nodey.
//!
//! `FlowError` covers startup and I/O failures outside the workflow itself.
//! Failures of individual workflow steps are `steps::StepError` and never
//! leave the orchestrator as an `Err`.

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::Io(err.to_string())
    }
}
