use std::fmt;
use std::process::ExitStatus;

use bytes::Bytes;

use crate::error::Result;

/// One unit of data (or a state change) observed on the worker's pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeEvent {
    /// A chunk read from the worker's standard output.
    Output(Bytes),
    /// A chunk read from the worker's standard error.
    Diagnostic(Bytes),
    /// The output pipe is gone; no further output will arrive.
    Exited(ExitDetail),
}

/// Why the worker stopped producing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitDetail {
    /// The worker exited with a status code.
    Exited(i32),
    /// The worker was terminated by a signal.
    Signaled(i32),
    /// The output pipe closed while the worker still looked alive.
    OutputClosed,
    /// Reading one of the worker's pipes failed.
    PipeFailed(String),
    /// There is no worker to wait on.
    NotRunning,
}

impl ExitDetail {
    /// Classify a reaped exit status.
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }
        Self::OutputClosed
    }
}

impl fmt::Display for ExitDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with return value {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::OutputClosed => f.write_str("output pipe closed"),
            Self::PipeFailed(msg) => write!(f, "pipe read failed: {msg}"),
            Self::NotRunning => f.write_str("not running"),
        }
    }
}

/// Lifecycle of a worker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No process has been started (or the last one was torn down).
    Absent,
    /// A process is being started.
    Spawning,
    /// A process is executing and its pipes are open.
    Running,
    /// A process handle exists but the process is gone.
    Dead,
}

/// A strictly request/response channel to a worker.
///
/// The frame reader and the transfer engine only see this trait, so they run
/// unchanged against a real [`WorkerSession`](crate::WorkerSession) or a
/// scripted channel.
pub trait WorkerChannel {
    /// Make sure a worker is executing, starting a fresh one if needed.
    fn ensure_running(&mut self) -> Result<()>;

    /// Write raw bytes to the worker's input pipe.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Block until the worker produces output or goes away.
    fn wait_for_data(&mut self) -> PipeEvent;

    /// Kill and release the worker. Safe to call when nothing is running.
    fn shutdown(&mut self);
}

impl<C: WorkerChannel + ?Sized> WorkerChannel for &mut C {
    fn ensure_running(&mut self) -> Result<()> {
        (**self).ensure_running()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn wait_for_data(&mut self) -> PipeEvent {
        (**self).wait_for_data()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}
