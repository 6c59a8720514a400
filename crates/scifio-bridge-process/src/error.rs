use crate::traits::ExitDetail;

/// Errors that can occur while starting or talking to the worker process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A required environment variable is not set.
    #[error("{var} is not set. {hint}")]
    NotConfigured { var: &'static str, hint: &'static str },

    /// The worker executable could not be started.
    #[error("failed to start worker {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The worker left the running state right after it was started.
    #[error("worker is not running after start: {0}")]
    Startup(ExitDetail),

    /// The worker state could not be queried.
    #[error("failed to query worker state: {0}")]
    Status(std::io::Error),

    /// An operation needed a running worker but none exists.
    #[error("worker is not running")]
    NotRunning,

    /// Writing to the worker's input pipe failed.
    #[error("worker I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
