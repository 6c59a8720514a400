use std::io::{ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::{ProcessError, Result};
use crate::traits::{ExitDetail, PipeEvent, WorkerChannel, WorkerState};

const READ_CHUNK_SIZE: usize = 8 * 1024;
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long trailing stderr output and the exit status are awaited once
/// stdout has closed.
const EXIT_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

enum PumpMessage {
    Chunk(Stream, Bytes),
    Closed(Stream),
    Failed(Stream, std::io::Error),
}

struct LiveWorker {
    child: Child,
    stdin: Option<ChildStdin>,
    events: Receiver<PumpMessage>,
    pumps: Vec<JoinHandle<()>>,
    output_closed: bool,
}

enum SessionState {
    Absent,
    Spawning,
    Running(LiveWorker),
    Dead(LiveWorker),
}

/// An owned worker process with an explicit lifecycle.
///
/// The process is started lazily by [`ensure_running`](WorkerChannel::ensure_running),
/// reused while it keeps executing, and killed and reaped by
/// [`shutdown`](WorkerChannel::shutdown) or on drop.
pub struct WorkerSession {
    config: WorkerConfig,
    state: SessionState,
}

impl WorkerSession {
    /// Create a session that will launch `config` on first use.
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            state: SessionState::Absent,
        }
    }

    /// Create a session for the java worker described by the environment.
    pub fn from_env() -> Result<Self> {
        WorkerConfig::from_env().map(Self::new)
    }

    /// The launch configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current lifecycle state, refreshed against the OS.
    pub fn state(&mut self) -> WorkerState {
        self.refresh();
        match &self.state {
            SessionState::Absent => WorkerState::Absent,
            SessionState::Spawning => WorkerState::Spawning,
            SessionState::Running(_) => WorkerState::Running,
            SessionState::Dead(_) => WorkerState::Dead,
        }
    }

    /// OS process id of the current worker, if one exists.
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            SessionState::Running(worker) | SessionState::Dead(worker) => Some(worker.child.id()),
            SessionState::Absent | SessionState::Spawning => None,
        }
    }

    fn refresh(&mut self) {
        let SessionState::Running(worker) = &mut self.state else {
            return;
        };
        match worker.child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                debug!(detail = %ExitDetail::from_status(status), "worker no longer executing");
                self.mark_dead();
            }
            Err(err) => {
                warn!(error = %err, "failed to query worker state");
                self.mark_dead();
            }
        }
    }

    fn mark_dead(&mut self) {
        self.state = match std::mem::replace(&mut self.state, SessionState::Absent) {
            SessionState::Running(worker) => SessionState::Dead(worker),
            other => other,
        };
    }

    fn spawn(&mut self) -> Result<()> {
        self.state = SessionState::Spawning;
        let program = self.config.program.display().to_string();

        let mut child = match Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                self.state = SessionState::Absent;
                return Err(ProcessError::Spawn { program, source });
            }
        };

        let stdin = child.stdin.take();
        let (tx, events) = mpsc::channel();
        let pumps = match start_pumps(&mut child, tx) {
            Ok(pumps) => pumps,
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                self.state = SessionState::Absent;
                return Err(ProcessError::Spawn { program, source });
            }
        };

        info!(pid = child.id(), %program, "started worker");
        self.state = SessionState::Running(LiveWorker {
            child,
            stdin,
            events,
            pumps,
            output_closed: false,
        });

        if let Err(err) = self.check_started() {
            warn!(error = %err, "worker failed to start");
            self.shutdown();
            return Err(err);
        }
        Ok(())
    }

    fn check_started(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.config.startup_grace;
        let SessionState::Running(worker) = &mut self.state else {
            return Err(ProcessError::NotRunning);
        };

        loop {
            match worker.child.try_wait() {
                Ok(Some(status)) => {
                    return Err(ProcessError::Startup(ExitDetail::from_status(status)));
                }
                Ok(None) => {}
                Err(err) => return Err(ProcessError::Status(err)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(STARTUP_POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl WorkerChannel for WorkerSession {
    fn ensure_running(&mut self) -> Result<()> {
        self.refresh();
        let stale = match &self.state {
            SessionState::Running(worker) if !worker.output_closed => return Ok(()),
            SessionState::Absent => false,
            SessionState::Spawning | SessionState::Running(_) | SessionState::Dead(_) => true,
        };
        if stale {
            debug!("worker not executing; tearing down stale handle");
            self.shutdown();
        }
        self.spawn()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let SessionState::Running(worker) = &mut self.state else {
            return Err(ProcessError::NotRunning);
        };
        let stdin = worker.stdin.as_mut().ok_or(ProcessError::NotRunning)?;

        let mut offset = 0usize;
        while offset < bytes.len() {
            match stdin.write(&bytes[offset..]) {
                Ok(0) => return Err(ProcessError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProcessError::Io(err)),
            }
        }

        loop {
            match stdin.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProcessError::Io(err)),
            }
        }
    }

    fn wait_for_data(&mut self) -> PipeEvent {
        let SessionState::Running(worker) = &mut self.state else {
            return PipeEvent::Exited(ExitDetail::NotRunning);
        };

        let detail = loop {
            let message = if worker.output_closed {
                match worker.events.recv_timeout(EXIT_DRAIN_TIMEOUT) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                        break worker.exit_detail();
                    }
                }
            } else {
                match worker.events.recv() {
                    Ok(message) => message,
                    Err(_) => break worker.exit_detail(),
                }
            };

            match message {
                PumpMessage::Chunk(Stream::Stdout, chunk) => return PipeEvent::Output(chunk),
                PumpMessage::Chunk(Stream::Stderr, chunk) => return PipeEvent::Diagnostic(chunk),
                PumpMessage::Closed(Stream::Stdout) => worker.output_closed = true,
                PumpMessage::Closed(Stream::Stderr) if worker.output_closed => {
                    break worker.exit_detail();
                }
                PumpMessage::Closed(Stream::Stderr) => {}
                PumpMessage::Failed(stream, err) => {
                    break ExitDetail::PipeFailed(format!("{}: {err}", stream.name()));
                }
            }
        };

        debug!(%detail, "worker output ended");
        self.mark_dead();
        PipeEvent::Exited(detail)
    }

    fn shutdown(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Absent) {
            SessionState::Running(worker) | SessionState::Dead(worker) => worker.terminate(),
            SessionState::Absent | SessionState::Spawning => {}
        }
    }
}

impl Drop for WorkerSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            SessionState::Absent => "absent",
            SessionState::Spawning => "spawning",
            SessionState::Running(_) => "running",
            SessionState::Dead(_) => "dead",
        };
        f.debug_struct("WorkerSession")
            .field("program", &self.config.program)
            .field("state", &state)
            .field("pid", &self.pid())
            .finish()
    }
}

impl LiveWorker {
    fn exit_detail(&mut self) -> ExitDetail {
        let deadline = Instant::now() + EXIT_DRAIN_TIMEOUT;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return ExitDetail::from_status(status),
                Ok(None) if Instant::now() < deadline => thread::sleep(STARTUP_POLL_INTERVAL),
                Ok(None) => return ExitDetail::OutputClosed,
                Err(err) => return ExitDetail::PipeFailed(err.to_string()),
            }
        }
    }

    fn terminate(mut self) {
        let pid = self.child.id();
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid, detail = %ExitDetail::from_status(status), "reaped worker");
            }
            _ => {
                debug!(pid, "killing worker");
                if let Err(err) = self.child.kill() {
                    warn!(pid, error = %err, "failed to kill worker");
                }
                if let Err(err) = self.child.wait() {
                    warn!(pid, error = %err, "failed to reap worker");
                }
            }
        }

        drop(self.stdin.take());
        drop(self.events);
        for pump in self.pumps {
            if pump.join().is_err() {
                warn!(pid, "worker pipe pump panicked");
            }
        }
    }
}

fn start_pumps(child: &mut Child, tx: Sender<PumpMessage>) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(spawn_pump(Stream::Stdout, stdout, tx.clone())?);
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(spawn_pump(Stream::Stderr, stderr, tx)?);
    }
    Ok(pumps)
}

fn spawn_pump<R>(stream: Stream, mut pipe: R, tx: Sender<PumpMessage>) -> std::io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("scifio-worker-{}", stream.name()))
        .spawn(move || {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                let message = match pipe.read(&mut chunk) {
                    Ok(0) => {
                        let _ = tx.send(PumpMessage::Closed(stream));
                        return;
                    }
                    Ok(n) => PumpMessage::Chunk(stream, Bytes::copy_from_slice(&chunk[..n])),
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        let _ = tx.send(PumpMessage::Failed(stream, err));
                        return;
                    }
                };
                if tx.send(message).is_err() {
                    return;
                }
            }
        })
}
