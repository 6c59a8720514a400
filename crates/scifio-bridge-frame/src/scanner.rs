use bytes::{Bytes, BytesMut};
use scifio_bridge_process::{ExitDetail, PipeEvent};

use crate::error::{FrameError, Result};
use crate::sentinel::FrameSentinel;

const INITIAL_TEXT_CAPACITY: usize = 1024;

/// Where a [`FrameScanner`] is in the current response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Appending output to the text buffer until it ends with the sentinel.
    AccumulatingText,
    /// Copying output into the destination; `remaining` bytes still expected.
    StreamingBinary { remaining: usize },
    /// The frame is complete.
    Done,
    /// The exchange cannot complete.
    Aborted,
}

/// What to do with output on the worker's diagnostic pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticPolicy {
    /// Record it and attach it to errors and debug logs.
    #[default]
    Capture,
    /// Treat any diagnostic output as a failed exchange.
    Abort,
}

/// Why a scanner ended in [`ScanState::Aborted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The worker stopped producing output.
    Exited(ExitDetail),
    /// Diagnostic output arrived under [`DiagnosticPolicy::Abort`].
    Diagnostic,
    /// More binary data arrived than was expected.
    Overrun,
}

/// Incremental state machine over the worker's pipe events.
///
/// Each event is consumed once. Text frames are checked for the sentinel by
/// looking at the end of the buffer after every output chunk; binary frames
/// are copied straight into the caller's buffer and bounded by a byte count.
#[derive(Debug)]
pub struct FrameScanner {
    sentinel: FrameSentinel,
    policy: DiagnosticPolicy,
    state: ScanState,
    text: BytesMut,
    diagnostics: BytesMut,
    offset: usize,
    abort: Option<AbortReason>,
}

impl FrameScanner {
    /// Scanner for a sentinel-terminated text frame.
    pub fn text(sentinel: FrameSentinel, policy: DiagnosticPolicy) -> Self {
        Self {
            sentinel,
            policy,
            state: ScanState::AccumulatingText,
            text: BytesMut::with_capacity(INITIAL_TEXT_CAPACITY),
            diagnostics: BytesMut::new(),
            offset: 0,
            abort: None,
        }
    }

    /// Scanner for a binary frame of exactly `len` bytes.
    pub fn binary(len: usize, policy: DiagnosticPolicy) -> Self {
        let state = if len == 0 {
            ScanState::Done
        } else {
            ScanState::StreamingBinary { remaining: len }
        };
        Self {
            sentinel: FrameSentinel::default(),
            policy,
            state,
            text: BytesMut::new(),
            diagnostics: BytesMut::new(),
            offset: 0,
            abort: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether the scanner reached `Done` or `Aborted`.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ScanState::Done | ScanState::Aborted)
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort.as_ref()
    }

    /// Diagnostic output seen so far.
    pub fn diagnostics(&self) -> &[u8] {
        &self.diagnostics
    }

    /// Text accumulated so far.
    pub fn text_bytes(&self) -> &[u8] {
        &self.text
    }

    /// Binary bytes copied into the destination so far.
    pub fn bytes_written(&self) -> usize {
        self.offset
    }

    /// Consume one event while accumulating a text frame.
    pub fn feed_text(&mut self, event: PipeEvent) -> Result<ScanState> {
        self.check_open()?;
        match event {
            PipeEvent::Output(chunk) => {
                if self.state != ScanState::AccumulatingText {
                    return Err(FrameError::UnexpectedState(self.state));
                }
                self.text.extend_from_slice(&chunk);
                if self.sentinel.terminates(&self.text) {
                    self.state = ScanState::Done;
                }
            }
            PipeEvent::Diagnostic(chunk) => self.on_diagnostic(&chunk),
            PipeEvent::Exited(detail) => self.abort_with(AbortReason::Exited(detail)),
        }
        Ok(self.state)
    }

    /// Consume one event while streaming a binary frame into `dst`.
    ///
    /// `dst` must be the same buffer, of the length given to
    /// [`FrameScanner::binary`], on every call.
    pub fn feed_binary(&mut self, event: PipeEvent, dst: &mut [u8]) -> Result<ScanState> {
        self.check_open()?;
        match event {
            PipeEvent::Output(chunk) => {
                let ScanState::StreamingBinary { remaining } = self.state else {
                    return Err(FrameError::UnexpectedState(self.state));
                };
                let end = self.offset + chunk.len();
                let target = match dst.get_mut(self.offset..end) {
                    Some(target) if chunk.len() <= remaining => target,
                    _ => {
                        self.abort_with(AbortReason::Overrun);
                        return Err(FrameError::Overrun {
                            expected: self.offset + remaining,
                            received: end,
                        });
                    }
                };
                target.copy_from_slice(&chunk);
                self.offset = end;
                self.state = match remaining - chunk.len() {
                    0 => ScanState::Done,
                    remaining => ScanState::StreamingBinary { remaining },
                };
            }
            PipeEvent::Diagnostic(chunk) => self.on_diagnostic(&chunk),
            PipeEvent::Exited(detail) => self.abort_with(AbortReason::Exited(detail)),
        }
        Ok(self.state)
    }

    /// Split into the text buffer and the diagnostic buffer.
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.text.freeze(), self.diagnostics.freeze())
    }

    fn check_open(&self) -> Result<()> {
        if self.is_finished() {
            return Err(FrameError::UnexpectedState(self.state));
        }
        Ok(())
    }

    fn on_diagnostic(&mut self, chunk: &[u8]) {
        self.diagnostics.extend_from_slice(chunk);
        if self.policy == DiagnosticPolicy::Abort {
            self.abort_with(AbortReason::Diagnostic);
        }
    }

    fn abort_with(&mut self, reason: AbortReason) {
        self.state = ScanState::Aborted;
        self.abort = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(bytes: &[u8]) -> PipeEvent {
        PipeEvent::Output(Bytes::copy_from_slice(bytes))
    }

    fn diag(bytes: &[u8]) -> PipeEvent {
        PipeEvent::Diagnostic(Bytes::copy_from_slice(bytes))
    }

    #[test]
    fn text_frame_in_one_chunk() {
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Capture);
        assert_eq!(scanner.feed_text(out(b"true\n\n")).unwrap(), ScanState::Done);
        let (text, diagnostics) = scanner.into_parts();
        assert_eq!(text.as_ref(), b"true\n\n");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn text_frame_byte_by_byte() {
        let frame = b"SizeX\n10\n\nSizeY\n20\n\n";
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Capture);

        let mut consumed = 0;
        for byte in frame.iter() {
            consumed += 1;
            if scanner.feed_text(out(&[*byte])).unwrap() == ScanState::Done {
                break;
            }
        }

        // The padding line after "10" ends a chunk with the sentinel too.
        assert_eq!(consumed, 10);
        assert_eq!(scanner.text_bytes(), b"SizeX\n10\n\n");
    }

    #[test]
    fn sentinel_inside_a_chunk_does_not_end_the_frame() {
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Capture);
        assert_eq!(
            scanner.feed_text(out(b"SizeX\n10\n\nSizeY")).unwrap(),
            ScanState::AccumulatingText
        );
        assert_eq!(scanner.feed_text(out(b"\n20\n\n")).unwrap(), ScanState::Done);
        assert_eq!(scanner.text_bytes(), b"SizeX\n10\n\nSizeY\n20\n\n");
    }

    #[test]
    fn crlf_sentinel_needs_both_pairs() {
        let mut scanner = FrameScanner::text(FrameSentinel::CrLf, DiagnosticPolicy::Capture);
        assert_eq!(
            scanner.feed_text(out(b"1\n\n")).unwrap(),
            ScanState::AccumulatingText
        );
        assert_eq!(scanner.feed_text(out(b"\r\n\r")).unwrap(), ScanState::AccumulatingText);
        assert_eq!(scanner.feed_text(out(b"\n")).unwrap(), ScanState::Done);
    }

    #[test]
    fn diagnostics_are_never_scanned() {
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Capture);
        assert_eq!(
            scanner.feed_text(diag(b"log4j warning\n\n")).unwrap(),
            ScanState::AccumulatingText
        );
        assert_eq!(scanner.feed_text(out(b"false\n\n")).unwrap(), ScanState::Done);
        assert_eq!(scanner.diagnostics(), b"log4j warning\n\n");
        assert_eq!(scanner.text_bytes(), b"false\n\n");
    }

    #[test]
    fn exit_aborts_with_detail() {
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Capture);
        scanner.feed_text(diag(b"NoClassDefFoundError")).unwrap();
        assert_eq!(
            scanner
                .feed_text(PipeEvent::Exited(ExitDetail::Exited(1)))
                .unwrap(),
            ScanState::Aborted
        );
        assert_eq!(
            scanner.abort_reason(),
            Some(&AbortReason::Exited(ExitDetail::Exited(1)))
        );
        assert_eq!(scanner.diagnostics(), b"NoClassDefFoundError");
    }

    #[test]
    fn abort_policy_stops_on_diagnostics() {
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Abort);
        assert_eq!(scanner.feed_text(diag(b"boom")).unwrap(), ScanState::Aborted);
        assert_eq!(scanner.abort_reason(), Some(&AbortReason::Diagnostic));
    }

    #[test]
    fn finished_scanner_rejects_events() {
        let mut scanner = FrameScanner::text(FrameSentinel::Lf, DiagnosticPolicy::Capture);
        scanner.feed_text(out(b"1\n\n")).unwrap();
        let err = scanner.feed_text(out(b"x")).unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedState(ScanState::Done)));
    }

    #[test]
    fn binary_frame_all_at_once() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let mut dst = vec![0u8; payload.len()];
        let mut scanner = FrameScanner::binary(dst.len(), DiagnosticPolicy::Capture);

        assert_eq!(
            scanner.feed_binary(out(&payload), &mut dst).unwrap(),
            ScanState::Done
        );
        assert_eq!(dst, payload);
    }

    #[test]
    fn binary_frame_byte_by_byte_keeps_order() {
        // Terminator bytes inside pixel data must not end the frame.
        let payload = b"\n\n\x00\xff\n\n\r\n".to_vec();
        let mut dst = vec![0u8; payload.len()];
        let mut scanner = FrameScanner::binary(dst.len(), DiagnosticPolicy::Capture);

        for (i, byte) in payload.iter().enumerate() {
            let state = scanner.feed_binary(out(&[*byte]), &mut dst).unwrap();
            let remaining = payload.len() - i - 1;
            if remaining == 0 {
                assert_eq!(state, ScanState::Done);
            } else {
                assert_eq!(state, ScanState::StreamingBinary { remaining });
            }
        }
        assert_eq!(dst, payload);
        assert_eq!(scanner.bytes_written(), payload.len());
    }

    #[test]
    fn binary_diagnostics_are_captured() {
        let mut dst = vec![0u8; 4];
        let mut scanner = FrameScanner::binary(4, DiagnosticPolicy::Capture);
        scanner.feed_binary(out(b"ab"), &mut dst).unwrap();
        assert_eq!(
            scanner.feed_binary(diag(b"slow disk"), &mut dst).unwrap(),
            ScanState::StreamingBinary { remaining: 2 }
        );
        scanner.feed_binary(out(b"cd"), &mut dst).unwrap();
        assert_eq!(dst, b"abcd");
        assert_eq!(scanner.diagnostics(), b"slow disk");
    }

    #[test]
    fn binary_overrun_is_rejected() {
        let mut dst = vec![0u8; 3];
        let mut scanner = FrameScanner::binary(3, DiagnosticPolicy::Capture);
        scanner.feed_binary(out(b"ab"), &mut dst).unwrap();
        let err = scanner.feed_binary(out(b"cd"), &mut dst).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Overrun {
                expected: 3,
                received: 4
            }
        ));
        assert_eq!(scanner.state(), ScanState::Aborted);
        assert_eq!(scanner.abort_reason(), Some(&AbortReason::Overrun));
    }

    #[test]
    fn empty_binary_frame_is_done_immediately() {
        let scanner = FrameScanner::binary(0, DiagnosticPolicy::Capture);
        assert_eq!(scanner.state(), ScanState::Done);
    }

    #[test]
    fn binary_exit_aborts() {
        let mut dst = vec![0u8; 8];
        let mut scanner = FrameScanner::binary(8, DiagnosticPolicy::Capture);
        scanner.feed_binary(out(b"1234"), &mut dst).unwrap();
        assert_eq!(
            scanner
                .feed_binary(PipeEvent::Exited(ExitDetail::Signaled(9)), &mut dst)
                .unwrap(),
            ScanState::Aborted
        );
    }
}
