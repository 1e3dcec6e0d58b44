//! Observability: tracing init and the execution audit log.
//!
//! Reads `config::ObservabilityConfig` for TESTSPACE_QUIET, LOG_LEVEL, LOG_JSON, AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Safe to call more than once (e.g. from every test).
/// When TESTSPACE_QUIET=1 only WARN and above are logged; RUST_LOG wins over both.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "testspace=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env().audit_log.clone()?;
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn execution_started_record(cmd: &str, args: &[&str], cwd: &str) -> serde_json::Value {
    json!({
        "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "event": "execution_started",
        "cmd": cmd,
        "args": args,
        "cwd": cwd,
    })
}

fn execution_completed_record(
    cmd: &str,
    exit_code: Option<i32>,
    duration_ms: u64,
    stdout_len: usize,
) -> serde_json::Value {
    json!({
        "ts": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "event": "execution_completed",
        "cmd": cmd,
        "exit_code": exit_code,
        "duration_ms": duration_ms,
        "stdout_len": stdout_len,
        "success": exit_code == Some(0),
    })
}

/// Audit: execution_started (right before spawn)
pub fn audit_execution_started(cmd: &str, args: &[&str], cwd: &str) {
    if let Some(path) = get_audit_path() {
        append_jsonl(&path, &execution_started_record(cmd, args, cwd));
    }
}

/// Audit: execution_completed. `exit_code` is `None` when the child died from a signal.
pub fn audit_execution_completed(
    cmd: &str,
    exit_code: Option<i32>,
    duration_ms: u64,
    stdout_len: usize,
) {
    if let Some(path) = get_audit_path() {
        append_jsonl(
            &path,
            &execution_completed_record(cmd, exit_code, duration_ms, stdout_len),
        );
    }
}
