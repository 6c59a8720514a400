/// The doubled line terminator that ends every text frame.
///
/// Resolved once (normally with [`FrameSentinel::platform`]) and handed to
/// everything that splits or terminates lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSentinel {
    /// `\n\n`
    Lf,
    /// `\r\n\r\n`
    CrLf,
}

impl FrameSentinel {
    /// The convention used by the worker on the current platform.
    pub const fn platform() -> Self {
        if cfg!(windows) {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    /// A single line terminator.
    pub const fn line_terminator(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// The full sentinel: two line terminators.
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n\n",
            Self::CrLf => b"\r\n\r\n",
        }
    }

    /// Whether `buf` ends with the sentinel.
    pub fn terminates(self, buf: &[u8]) -> bool {
        buf.ends_with(self.bytes())
    }
}

impl Default for FrameSentinel {
    fn default() -> Self {
        Self::platform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_two_terminators() {
        for sentinel in [FrameSentinel::Lf, FrameSentinel::CrLf] {
            let doubled = sentinel.line_terminator().repeat(2);
            assert_eq!(sentinel.bytes(), doubled.as_bytes());
        }
    }

    #[test]
    fn terminates_checks_suffix_only() {
        assert!(FrameSentinel::Lf.terminates(b"true\n\n"));
        assert!(!FrameSentinel::Lf.terminates(b"a\n\nb"));
        assert!(!FrameSentinel::Lf.terminates(b"\n"));
        assert!(FrameSentinel::CrLf.terminates(b"1\r\n\r\n"));
        assert!(!FrameSentinel::CrLf.terminates(b"1\n\n"));
    }

    #[test]
    fn default_matches_platform() {
        assert_eq!(FrameSentinel::default(), FrameSentinel::platform());
        #[cfg(unix)]
        assert_eq!(FrameSentinel::platform(), FrameSentinel::Lf);
    }
}
