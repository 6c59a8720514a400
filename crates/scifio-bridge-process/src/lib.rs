//! Worker process supervision for the SCIFIO bridge.
//!
//! This is the lowest layer of scifio-bridge. It owns the external worker
//! (a JVM running `ITKBridgePipes`), its stdin write end and the two output
//! pipes, and turns everything the worker produces into a single ordered
//! stream of [`PipeEvent`]s:
//! - `Output` chunks from the worker's stdout
//! - `Diagnostic` chunks from the worker's stderr
//! - `Exited` once the output pipe is gone
//!
//! Everything above this crate talks to the worker through the
//! [`WorkerChannel`] trait.

pub mod config;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod traits;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{ProcessError, Result};
#[cfg(any(test, feature = "testing"))]
pub use scripted::{Exchange, ScriptedChannel};
pub use traits::{ExitDetail, PipeEvent, WorkerChannel, WorkerState};
pub use worker::WorkerSession;
