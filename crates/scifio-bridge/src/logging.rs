use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Crates whose events follow `--log-level`. Everything else stays at warn or quieter.
const BRIDGE_TARGETS: [&str; 5] = [
    "scifio_bridge",
    "scifio_bridge_process",
    "scifio_bridge_frame",
    "scifio_bridge_meta",
    "scifio_bridge_session",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn log_filter(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_default(level.min(LevelFilter::WARN))
        .with_targets(BRIDGE_TARGETS.map(|target| (target, level)))
}

/// Logs go to stderr; stdout carries command output only.
///
/// Event targets are printed from debug upwards, where it matters which
/// layer (process, frame, session) reported a worker problem.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = log_filter(level);
    let show_target = level.as_filter() >= LevelFilter::DEBUG;
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(show_target);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init(),
    };
}
