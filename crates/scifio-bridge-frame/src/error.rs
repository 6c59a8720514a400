use scifio_bridge_process::{ExitDetail, ProcessError};

use crate::scanner::ScanState;

/// Errors that can occur while reading a response frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The worker went away before the frame was complete.
    #[error("'ITKBridgePipes {context}' exited abnormally ({detail}). {diagnostics}")]
    Aborted {
        context: String,
        detail: ExitDetail,
        diagnostics: String,
    },

    /// The worker wrote to its diagnostic pipe while diagnostics abort exchanges.
    #[error("'ITKBridgePipes {context}' reported an error: {diagnostics}")]
    Diagnostic {
        context: String,
        diagnostics: String,
    },

    /// The worker sent more binary data than was agreed.
    #[error("binary frame overrun ({received} bytes received, {expected} expected)")]
    Overrun { expected: usize, received: usize },

    /// An event was fed to a scanner that cannot accept it.
    #[error("frame scanner cannot accept data in state {0:?}")]
    UnexpectedState(ScanState),

    /// The worker could not be reached.
    #[error("worker error: {0}")]
    Process(#[from] ProcessError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
