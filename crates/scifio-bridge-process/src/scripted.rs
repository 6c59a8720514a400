use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::{ProcessError, Result};
use crate::traits::{ExitDetail, PipeEvent, WorkerChannel};

/// One step of the conversation recorded by a [`ScriptedChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// Bytes written to the worker.
    Sent(Vec<u8>),
    /// An event handed back from `wait_for_data`.
    Received(PipeEvent),
}

/// A worker stand-in that replays a fixed list of pipe events.
///
/// Useful for adapter tests that must not start a JVM. Every write and every
/// delivered event is recorded in order, so handshakes can be checked step by
/// step. When the script runs dry the channel reports a closed output pipe
/// instead of blocking forever.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    script: VecDeque<PipeEvent>,
    transcript: Vec<Exchange>,
    has_worker: bool,
    running: bool,
    starts: usize,
    teardowns: usize,
    start_failure: Option<ExitDetail>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk on the output pipe.
    pub fn push_output(&mut self, bytes: impl Into<Bytes>) -> &mut Self {
        self.push_event(PipeEvent::Output(bytes.into()))
    }

    /// Queue a chunk on the diagnostic pipe.
    pub fn push_diagnostic(&mut self, bytes: impl Into<Bytes>) -> &mut Self {
        self.push_event(PipeEvent::Diagnostic(bytes.into()))
    }

    /// Queue the worker going away.
    pub fn push_exit(&mut self, detail: ExitDetail) -> &mut Self {
        self.push_event(PipeEvent::Exited(detail))
    }

    pub fn push_event(&mut self, event: PipeEvent) -> &mut Self {
        self.script.push_back(event);
        self
    }

    /// Make the next start attempt fail as if the worker died immediately.
    pub fn fail_next_start(&mut self, detail: ExitDetail) -> &mut Self {
        self.start_failure = Some(detail);
        self
    }

    /// Everything written and received so far, in order.
    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// All bytes written to the worker, concatenated.
    pub fn sent(&self) -> Vec<u8> {
        self.transcript
            .iter()
            .filter_map(|step| match step {
                Exchange::Sent(bytes) => Some(bytes.as_slice()),
                Exchange::Received(_) => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Events still waiting to be delivered.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Whether a worker is currently considered executing.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// How many times a worker was started.
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// How many times an existing worker was torn down.
    pub fn teardowns(&self) -> usize {
        self.teardowns
    }
}

impl WorkerChannel for ScriptedChannel {
    fn ensure_running(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.shutdown();
        if let Some(detail) = self.start_failure.take() {
            return Err(ProcessError::Startup(detail));
        }
        self.has_worker = true;
        self.running = true;
        self.starts += 1;
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.running {
            return Err(ProcessError::NotRunning);
        }
        self.transcript.push(Exchange::Sent(bytes.to_vec()));
        Ok(())
    }

    fn wait_for_data(&mut self) -> PipeEvent {
        if !self.running {
            return PipeEvent::Exited(ExitDetail::NotRunning);
        }
        let event = self
            .script
            .pop_front()
            .unwrap_or(PipeEvent::Exited(ExitDetail::OutputClosed));
        if matches!(event, PipeEvent::Exited(_)) {
            self.running = false;
        }
        self.transcript.push(Exchange::Received(event.clone()));
        event
    }

    fn shutdown(&mut self) {
        if self.has_worker {
            self.teardowns += 1;
        }
        self.has_worker = false;
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_events_in_order() {
        let mut channel = ScriptedChannel::new();
        channel.push_output("1\n\n").push_diagnostic("warn");
        channel.ensure_running().unwrap();

        assert_eq!(channel.wait_for_data(), PipeEvent::Output(Bytes::from("1\n\n")));
        assert_eq!(
            channel.wait_for_data(),
            PipeEvent::Diagnostic(Bytes::from("warn"))
        );
        assert_eq!(
            channel.wait_for_data(),
            PipeEvent::Exited(ExitDetail::OutputClosed)
        );
        assert!(!channel.is_running());
    }

    #[test]
    fn records_sends_and_restarts() {
        let mut channel = ScriptedChannel::new();
        assert!(channel.send(b"x").is_err());

        channel.ensure_running().unwrap();
        channel.send(b"info\t").unwrap();
        channel.send(b"a.tif\n").unwrap();
        assert_eq!(channel.sent(), b"info\ta.tif\n");

        channel.shutdown();
        channel.shutdown();
        assert_eq!(channel.teardowns(), 1);

        channel.ensure_running().unwrap();
        assert_eq!(channel.starts(), 2);
    }

    #[test]
    fn start_failure_is_reported_once() {
        let mut channel = ScriptedChannel::new();
        channel.fail_next_start(ExitDetail::Exited(1));
        assert!(matches!(
            channel.ensure_running(),
            Err(ProcessError::Startup(ExitDetail::Exited(1)))
        ));
        assert!(!channel.is_running());
        channel.ensure_running().unwrap();
    }
}
