use scifio_bridge_frame::FrameError;
use scifio_bridge_meta::MetaError;
use scifio_bridge_process::ProcessError;

/// Errors that can occur during a bridge request.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The worker could not be configured, started or written to.
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    /// The reply could not be read.
    #[error("{0}")]
    Frame(#[from] FrameError),

    /// The reply could not be decoded.
    #[error("metadata error: {0}")]
    Meta(#[from] MetaError),

    /// The worker answered something the protocol does not allow.
    #[error("'ITKBridgePipes {context}' protocol error: {message}")]
    Protocol {
        context: &'static str,
        message: String,
    },

    /// A pixel buffer does not match the region being transferred.
    #[error("pixel buffer holds {actual} bytes, {expected} required")]
    BufferSize { expected: usize, actual: usize },

    /// The path cannot be sent in a tab-separated command line.
    #[error("invalid path {0:?}: must be UTF-8 without tabs or line breaks")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
