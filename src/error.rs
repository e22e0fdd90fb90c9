//! Error types for the guth agent.

/// Top-level error type for the speech-synthesizer agent.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// Malformed or unusable directive payload.
    #[error("directive error: {0}")]
    Directive(String),

    /// Attachment could not be resolved or read.
    #[error("attachment error: {0}")]
    Attachment(String),

    /// Media player rejected an operation.
    #[error("media error: {0}")]
    Media(String),

    /// Audio-channel focus could not be acquired or released.
    #[error("focus error: {0}")]
    Focus(String),

    /// Context manager rejected a state update.
    #[error("context error: {0}")]
    Context(String),

    /// Event transport failure.
    #[error("event error: {0}")]
    Event(String),

    /// Executor could not be started or rejected a task.
    #[error("executor error: {0}")]
    Executor(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SynthError>;
