//! Response framing for the SCIFIO bridge protocol.
//!
//! The worker answers on a single byte stream that carries two kinds of frame:
//! - Text frames (booleans, metadata dumps, acknowledgements), terminated by
//!   a doubled line terminator, the [`FrameSentinel`]
//! - Binary frames (pixel data), bounded by a byte count agreed in-band
//!
//! Binary payloads may contain terminator bytes by chance, so they are never
//! scanned for the sentinel.

pub mod error;
pub mod reader;
pub mod scanner;
pub mod sentinel;

pub use error::{FrameError, Result};
pub use reader::{FrameReader, TextFrame};
pub use scanner::{AbortReason, DiagnosticPolicy, FrameScanner, ScanState};
pub use sentinel::FrameSentinel;
