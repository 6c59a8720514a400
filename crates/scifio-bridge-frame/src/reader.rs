use std::borrow::Cow;

use bytes::Bytes;
use scifio_bridge_process::{ExitDetail, WorkerChannel};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::scanner::{AbortReason, DiagnosticPolicy, FrameScanner, ScanState};
use crate::sentinel::FrameSentinel;

/// A complete sentinel-terminated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    bytes: Bytes,
    diagnostics: Bytes,
    sentinel: FrameSentinel,
}

impl TextFrame {
    pub fn new(bytes: impl Into<Bytes>, diagnostics: impl Into<Bytes>, sentinel: FrameSentinel) -> Self {
        Self {
            bytes: bytes.into(),
            diagnostics: diagnostics.into(),
            sentinel,
        }
    }

    /// Raw frame bytes, sentinel included.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Diagnostic output captured while the frame was read.
    pub fn diagnostics(&self) -> &Bytes {
        &self.diagnostics
    }

    pub fn sentinel(&self) -> FrameSentinel {
        self.sentinel
    }

    /// The frame decoded as text (invalid UTF-8 replaced).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Everything before the first line terminator.
    pub fn first_line(&self) -> String {
        let text = self.text();
        match text.find(self.sentinel.line_terminator()) {
            Some(end) => text[..end].to_string(),
            None => text.into_owned(),
        }
    }

    /// Non-empty lines of the frame, in order.
    pub fn lines(&self) -> Vec<String> {
        self.text()
            .split(self.sentinel.line_terminator())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Reads response frames from a worker channel.
///
/// Any exchange that cannot complete tears the worker down before the error
/// is returned, so the next request starts from a fresh process.
pub struct FrameReader<'a, C: WorkerChannel + ?Sized> {
    channel: &'a mut C,
    sentinel: FrameSentinel,
    policy: DiagnosticPolicy,
}

impl<'a, C: WorkerChannel + ?Sized> FrameReader<'a, C> {
    /// Create a reader that captures diagnostic output.
    pub fn new(channel: &'a mut C, sentinel: FrameSentinel) -> Self {
        Self {
            channel,
            sentinel,
            policy: DiagnosticPolicy::Capture,
        }
    }

    /// Choose how diagnostic output is treated.
    pub fn with_policy(mut self, policy: DiagnosticPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn sentinel(&self) -> FrameSentinel {
        self.sentinel
    }

    pub fn policy(&self) -> DiagnosticPolicy {
        self.policy
    }

    /// Mutably borrow the underlying channel (e.g. to send between frames).
    pub fn channel_mut(&mut self) -> &mut C {
        self.channel
    }

    /// Read the next sentinel-terminated frame (blocking).
    ///
    /// `context` names the command for error messages.
    pub fn read_text_frame(&mut self, context: &str) -> Result<TextFrame> {
        let mut scanner = FrameScanner::text(self.sentinel, self.policy);
        while !scanner.is_finished() {
            let event = self.channel.wait_for_data();
            if let Err(err) = scanner.feed_text(event) {
                self.channel.shutdown();
                return Err(err);
            }
        }

        let (text, diagnostics) = self.finish(context, scanner)?;
        Ok(TextFrame {
            bytes: text,
            diagnostics,
            sentinel: self.sentinel,
        })
    }

    /// Fill `dst` with exactly `dst.len()` bytes of binary output (blocking).
    ///
    /// Returns the diagnostic output captured meanwhile. There is no partial
    /// result: on error the contents of `dst` are unspecified.
    pub fn read_binary_into(&mut self, context: &str, dst: &mut [u8]) -> Result<Bytes> {
        let mut scanner = FrameScanner::binary(dst.len(), self.policy);
        while !scanner.is_finished() {
            let event = self.channel.wait_for_data();
            if let Err(err) = scanner.feed_binary(event, dst) {
                self.channel.shutdown();
                return Err(err);
            }
        }

        let (_, diagnostics) = self.finish(context, scanner)?;
        Ok(diagnostics)
    }

    fn finish(&mut self, context: &str, scanner: FrameScanner) -> Result<(Bytes, Bytes)> {
        if scanner.state() != ScanState::Aborted {
            let (text, diagnostics) = scanner.into_parts();
            if !diagnostics.is_empty() {
                debug!(
                    context,
                    diagnostics = %String::from_utf8_lossy(&diagnostics),
                    "worker error output"
                );
            }
            return Ok((text, diagnostics));
        }

        self.channel.shutdown();
        let reason = scanner.abort_reason().cloned();
        let (_, diagnostics) = scanner.into_parts();
        let diagnostics = String::from_utf8_lossy(&diagnostics).into_owned();
        let context = context.to_string();

        Err(match reason {
            Some(AbortReason::Diagnostic) => FrameError::Diagnostic {
                context,
                diagnostics,
            },
            Some(AbortReason::Exited(detail)) => FrameError::Aborted {
                context,
                detail,
                diagnostics,
            },
            Some(AbortReason::Overrun) | None => FrameError::Aborted {
                context,
                detail: ExitDetail::OutputClosed,
                diagnostics,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use scifio_bridge_process::{PipeEvent, ScriptedChannel};

    use super::*;

    fn running(channel: &mut ScriptedChannel) -> &mut ScriptedChannel {
        channel.ensure_running().unwrap();
        channel
    }

    #[test]
    fn reads_boolean_reply() {
        let mut channel = ScriptedChannel::new();
        channel.push_output("tr").push_output("ue\n\n");
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let frame = reader.read_text_frame("canRead").unwrap();
        assert_eq!(frame.first_line(), "true");
        assert_eq!(frame.bytes().as_ref(), b"true\n\n");
        assert_eq!(channel.remaining(), 0);
    }

    #[test]
    fn first_line_strips_crlf() {
        let frame = TextFrame::new("1\r\n\r\n", Bytes::new(), FrameSentinel::CrLf);
        assert_eq!(frame.first_line(), "1");
        assert_eq!(frame.lines(), vec!["1".to_string()]);
    }

    #[test]
    fn captured_diagnostics_travel_with_the_frame() {
        let mut channel = ScriptedChannel::new();
        channel
            .push_diagnostic("SLF4J: no binding\n")
            .push_output("false\n\n");
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let frame = reader.read_text_frame("canWrite").unwrap();
        assert_eq!(frame.first_line(), "false");
        assert_eq!(frame.diagnostics().as_ref(), b"SLF4J: no binding\n");
    }

    #[test]
    fn exit_mid_frame_tears_down_and_reports_diagnostics() {
        let mut channel = ScriptedChannel::new();
        channel
            .push_output("SizeX\n")
            .push_diagnostic("java.io.IOException: bad file")
            .push_exit(ExitDetail::Exited(1));
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let err = reader.read_text_frame("info").unwrap_err();
        match err {
            FrameError::Aborted {
                context,
                detail,
                diagnostics,
            } => {
                assert_eq!(context, "info");
                assert_eq!(detail, ExitDetail::Exited(1));
                assert_eq!(diagnostics, "java.io.IOException: bad file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(channel.teardowns(), 1);
    }

    #[test]
    fn abort_policy_fails_on_diagnostics() {
        let mut channel = ScriptedChannel::new();
        channel.push_diagnostic("boom").push_output("true\n\n");
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf)
            .with_policy(DiagnosticPolicy::Abort);

        let err = reader.read_text_frame("canRead").unwrap_err();
        assert!(matches!(err, FrameError::Diagnostic { .. }));
        assert_eq!(channel.teardowns(), 1);
    }

    #[test]
    fn binary_read_all_at_once() {
        let payload: Vec<u8> = (0..64u8).collect();
        let mut channel = ScriptedChannel::new();
        channel.push_output(payload.clone());
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let mut dst = vec![0u8; 64];
        reader.read_binary_into("read", &mut dst).unwrap();
        assert_eq!(dst, payload);
    }

    #[test]
    fn binary_read_one_byte_at_a_time() {
        let payload: Vec<u8> = (0..64u8).rev().collect();
        let mut channel = ScriptedChannel::new();
        for byte in &payload {
            channel.push_output(vec![*byte]);
        }
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let mut dst = vec![0u8; 64];
        reader.read_binary_into("read", &mut dst).unwrap();
        assert_eq!(dst, payload);
        assert_eq!(channel.remaining(), 0);
    }

    #[test]
    fn binary_read_uneven_chunks() {
        let payload: Vec<u8> = (0..100u8).map(|b| b.wrapping_mul(7)).collect();
        let mut channel = ScriptedChannel::new();
        let mut start = 0;
        for len in [1usize, 2, 3, 5, 8, 13, 21, 47] {
            channel.push_output(payload[start..start + len].to_vec());
            start += len;
        }
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let mut dst = vec![0u8; 100];
        reader.read_binary_into("read", &mut dst).unwrap();
        assert_eq!(dst, payload);
    }

    #[test]
    fn binary_overrun_tears_down() {
        let mut channel = ScriptedChannel::new();
        channel.push_output(vec![1u8; 5]);
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let mut dst = vec![0u8; 4];
        let err = reader.read_binary_into("read", &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::Overrun { .. }));
        assert_eq!(channel.teardowns(), 1);
    }

    #[test]
    fn truncated_binary_read_fails() {
        let mut channel = ScriptedChannel::new();
        channel
            .push_output(vec![9u8; 3])
            .push_event(PipeEvent::Exited(ExitDetail::Signaled(9)));
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);

        let mut dst = vec![0u8; 6];
        let err = reader.read_binary_into("read", &mut dst).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Aborted {
                detail: ExitDetail::Signaled(9),
                ..
            }
        ));
    }

    #[test]
    fn empty_binary_read_does_not_wait() {
        let mut channel = ScriptedChannel::new();
        let mut reader = FrameReader::new(running(&mut channel), FrameSentinel::Lf);
        reader.read_binary_into("read", &mut []).unwrap();
        assert!(channel.transcript().is_empty());
    }
}
