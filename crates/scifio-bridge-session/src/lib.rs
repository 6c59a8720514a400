//! Request/response sessions with the SCIFIO worker.
//!
//! This is the layer an image adapter talks to. [`Bridge`] owns one worker,
//! encodes each request as a command line, and decodes the reply into typed
//! values or pixel buffers.

pub mod bridge;
pub mod command;
pub mod error;
pub mod transfer;

pub use bridge::{Bridge, BridgeConfig, Description, WriteRequest, DEFAULT_WRITE_CHUNK_SIZE};
pub use error::{BridgeError, Result};
pub use transfer::{read_region_data, write_region_data, WriteStats};
