use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use scifio_bridge::process::config::{
    DEFAULT_MAX_HEAP, JAVA_HOME_VAR, MAX_HEAP_VAR, SCIFIO_PATH_VAR,
};
use scifio_bridge::process::{WorkerChannel, WorkerConfig, WorkerSession, WorkerState};

use crate::cmd::{parse_duration, DoctorArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let grace = parse_duration(&args.startup_grace)?;
    let lookup = |name: &str| std::env::var_os(name).filter(|value| !value.is_empty());

    let mut checks = vec![
        scifio_path_check(&lookup),
        java_home_check(&lookup),
        java_heap_check(&lookup),
    ];
    if args.no_start {
        checks.push(CheckResult::new(
            "worker_start",
            CheckStatus::Skip,
            "disabled by --no-start",
        ));
    } else {
        checks.push(worker_start_check(&lookup, grace));
    }
    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        schema_id: "https://schemas.3leaps.dev/scifio-bridge/cli/v1/doctor-report.schema.json",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("scifio-bridge doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn scifio_path_check(lookup: &dyn Fn(&str) -> Option<OsString>) -> CheckResult {
    const NAME: &str = "scifio_path";
    let Some(value) = lookup(SCIFIO_PATH_VAR) else {
        return CheckResult::new(NAME, CheckStatus::Fail, format!("{SCIFIO_PATH_VAR} not set"));
    };

    let path = PathBuf::from(value);
    if !path.is_dir() {
        return CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("{} is not a directory", path.display()),
        );
    }

    match count_jars(&path) {
        Ok(0) => CheckResult::new(
            NAME,
            CheckStatus::Warn,
            format!("{} contains no .jar files", path.display()),
        ),
        Ok(n) => CheckResult::new(
            NAME,
            CheckStatus::Pass,
            format!("{} ({n} jar files)", path.display()),
        ),
        Err(err) => CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("{} could not be listed: {err}", path.display()),
        ),
    }
}

fn count_jars(dir: &Path) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "jar") {
            count += 1;
        }
    }
    Ok(count)
}

fn java_home_check(lookup: &dyn Fn(&str) -> Option<OsString>) -> CheckResult {
    const NAME: &str = "java_home";
    let Some(home) = lookup(JAVA_HOME_VAR) else {
        return CheckResult::new(
            NAME,
            CheckStatus::Warn,
            format!("{JAVA_HOME_VAR} not set; java will be looked up on PATH"),
        );
    };

    let java = Path::new(&home).join("bin").join("java");
    if java.is_file() {
        CheckResult::new(NAME, CheckStatus::Pass, java.display().to_string())
    } else {
        CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("{} not found", java.display()),
        )
    }
}

fn java_heap_check(lookup: &dyn Fn(&str) -> Option<OsString>) -> CheckResult {
    let detail = match lookup(MAX_HEAP_VAR) {
        Some(heap) => format!("-Xmx{}", heap.to_string_lossy()),
        None => format!("-Xmx{DEFAULT_MAX_HEAP} (default)"),
    };
    CheckResult::new("java_heap", CheckStatus::Info, detail)
}

fn worker_start_check(
    lookup: &dyn Fn(&str) -> Option<OsString>,
    grace: Duration,
) -> CheckResult {
    const NAME: &str = "worker_start";
    let config = match WorkerConfig::from_lookup(lookup) {
        Ok(config) => config.with_startup_grace(grace),
        Err(err) => return CheckResult::new(NAME, CheckStatus::Skip, err.to_string()),
    };

    let mut session = WorkerSession::new(config);
    let result = session.ensure_running();
    let state = session.state();
    let pid = session.pid();
    session.shutdown();

    match (result, state) {
        (Ok(()), WorkerState::Running) => CheckResult::new(
            NAME,
            CheckStatus::Pass,
            format!(
                "worker alive after {}ms (pid {})",
                grace.as_millis(),
                pid.map_or_else(|| "?".to_string(), |pid| pid.to_string())
            ),
        ),
        (Ok(()), state) => CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("worker left running state: {state:?}"),
        ),
        (Err(err), _) => CheckResult::new(NAME, CheckStatus::Fail, err.to_string()),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "cli") {
        features.push("cli");
    }
    features.push(if cfg!(windows) { "crlf-frames" } else { "lf-frames" });

    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn doctor_output_has_overall_status() {
        let checks = vec![CheckResult::new("x", CheckStatus::Pass, "ok")];
        let output = DoctorOutput {
            schema_id: "x",
            checks,
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }

    #[test]
    fn missing_scifio_path_fails() {
        let check = scifio_path_check(&lookup_from(&[]));
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.detail.contains(SCIFIO_PATH_VAR));
    }

    #[test]
    fn scifio_path_must_be_a_directory() {
        let check = scifio_path_check(&lookup_from(&[(SCIFIO_PATH_VAR, "/definitely/not/here")]));
        assert_eq!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn missing_java_home_only_warns() {
        let check = java_home_check(&lookup_from(&[]));
        assert_eq!(check.status, CheckStatus::Warn);
    }

    #[test]
    fn java_heap_reports_default() {
        let check = java_heap_check(&lookup_from(&[]));
        assert_eq!(check.detail, "-Xmx256m (default)");
        let check = java_heap_check(&lookup_from(&[(MAX_HEAP_VAR, "2g")]));
        assert_eq!(check.detail, "-Xmx2g");
    }

    #[test]
    fn worker_start_is_skipped_without_configuration() {
        let check = worker_start_check(&lookup_from(&[]), Duration::ZERO);
        assert_eq!(check.status, CheckStatus::Skip);
    }
}
