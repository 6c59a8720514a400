use std::fmt;
use std::io;

use scifio_bridge::frame::FrameError;
use scifio_bridge::process::ProcessError;
use scifio_bridge::BridgeError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const WORKER_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const CONFIG_INVALID: i32 = 78;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => CONFIG_INVALID,
        io::ErrorKind::BrokenPipe => WORKER_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn process_error(context: &str, err: ProcessError) -> CliError {
    match err {
        ProcessError::NotConfigured { .. } => {
            CliError::new(CONFIG_INVALID, format!("{context}: {err}"))
        }
        ProcessError::Spawn { source, program } => io_error(
            context,
            io::Error::new(source.kind(), format!("failed to start {program}: {source}")),
        ),
        ProcessError::Status(source) | ProcessError::Io(source) => io_error(context, source),
        other => CliError::new(WORKER_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Process(err) => process_error(context, err),
        FrameError::Aborted { .. } | FrameError::Diagnostic { .. } => {
            CliError::new(WORKER_ERROR, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Process(err) => process_error(context, err),
        BridgeError::Frame(err) => frame_error(context, err),
        BridgeError::Meta(_) | BridgeError::Protocol { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        BridgeError::InvalidPath(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use scifio_bridge::meta::MetaError;
    use scifio_bridge::process::ExitDetail;

    use super::*;

    #[test]
    fn missing_configuration_maps_to_config_invalid() {
        let err = bridge_error(
            "probe",
            BridgeError::Process(ProcessError::NotConfigured {
                var: "SCIFIO_PATH",
                hint: "set it",
            }),
        );
        assert_eq!(err.code, CONFIG_INVALID);
        assert!(err.message.starts_with("probe: SCIFIO_PATH"));
    }

    #[test]
    fn worker_exit_maps_to_worker_error() {
        let err = bridge_error(
            "describe",
            BridgeError::Frame(FrameError::Aborted {
                context: "info".to_string(),
                detail: ExitDetail::Exited(1),
                diagnostics: String::new(),
            }),
        );
        assert_eq!(err.code, WORKER_ERROR);
    }

    #[test]
    fn metadata_and_path_errors() {
        let err = bridge_error("describe", BridgeError::Meta(MetaError::UnknownPixelType(9)));
        assert_eq!(err.code, DATA_INVALID);

        let err = bridge_error("probe", BridgeError::InvalidPath("a\tb".to_string()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn spawn_failure_uses_io_kind() {
        let err = process_error(
            "doctor",
            ProcessError::Spawn {
                program: "/missing/java".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, CONFIG_INVALID);
        assert!(err.message.contains("/missing/java"));
    }
}
