use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod envinfo;
pub mod probe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the worker whether it can read (and write) a file, and describe it.
    Probe(ProbeArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Envinfo(args) => envinfo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Image file to probe.
    pub path: PathBuf,
    /// Also ask whether the format can be written.
    #[arg(long)]
    pub writable: bool,
    /// How long to watch the worker after start (e.g. 500ms, 2s).
    #[arg(long, default_value = "0ms")]
    pub startup_grace: String,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Skip the worker start check.
    #[arg(long)]
    pub no_start: bool,
    /// How long the started worker must stay alive to pass (e.g. 500ms, 2s).
    #[arg(long, default_value = "500ms")]
    pub startup_grace: String,
}

#[derive(Args, Debug)]
pub struct EnvinfoArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Include build details.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
