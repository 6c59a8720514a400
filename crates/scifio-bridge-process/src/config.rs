use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ProcessError, Result};

/// Directory containing the SCIFIO jar files. Required.
pub const SCIFIO_PATH_VAR: &str = "SCIFIO_PATH";
/// Java installation used to run the worker. Optional.
pub const JAVA_HOME_VAR: &str = "JAVA_HOME";
/// Maximum JVM heap for the worker (`-Xmx`). Optional.
pub const MAX_HEAP_VAR: &str = "SCIFIO_JAVA_MAX_HEAP";

/// Heap size used when `SCIFIO_JAVA_MAX_HEAP` is not set.
pub const DEFAULT_MAX_HEAP: &str = "256m";
/// Entry point of the worker program.
pub const WORKER_MAIN_CLASS: &str = "loci.formats.itk.ITKBridgePipes";
/// Mode argument that keeps the worker reading commands from stdin.
pub const WORKER_MODE: &str = "waitForInput";

/// How to launch the worker process.
///
/// Built once per bridge; the argument vector never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<OsString>,
    /// How long to watch a fresh process before declaring it started.
    pub startup_grace: Duration,
}

impl WorkerConfig {
    /// Launch an arbitrary executable with the given arguments.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            startup_grace: Duration::ZERO,
        }
    }

    /// Resolve the java worker command from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Resolve the java worker command through an explicit variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let scifio_path = get(SCIFIO_PATH_VAR).ok_or(ProcessError::NotConfigured {
            var: SCIFIO_PATH_VAR,
            hint: "This environment variable must point to the directory containing the SCIFIO JAR files",
        })?;
        let classpath = Path::new(&scifio_path).join("*");

        let java = match get(JAVA_HOME_VAR) {
            Some(home) => Path::new(&home).join("bin").join("java"),
            None => {
                warn!("{JAVA_HOME_VAR} not set; assuming java is on the PATH");
                PathBuf::from("java")
            }
        };

        let heap = get(MAX_HEAP_VAR).unwrap_or_else(|| OsString::from(DEFAULT_MAX_HEAP));
        let mut xmx = OsString::from("-Xmx");
        xmx.push(&heap);

        let config = Self::new(
            java,
            [
                xmx,
                OsString::from("-Djava.awt.headless=true"),
                OsString::from("-cp"),
                classpath.into_os_string(),
                OsString::from(WORKER_MAIN_CLASS),
                OsString::from(WORKER_MODE),
            ],
        );
        debug!(command = %config.display_command(), "resolved worker command");
        Ok(config)
    }

    /// Set the post-spawn observation window.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// Program and arguments joined with spaces, for diagnostics.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
