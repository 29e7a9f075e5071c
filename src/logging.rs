//! Tracing setup shared by the HTTP server, the MCP server, and the `gist` CLI.
//!
//! Every binary logs to stderr and to a file named after itself under `logs/`. Setting
//! `SMARTGIST_LOG_FILE` sends the file output somewhere else. Stdout stays untouched: the MCP
//! stdio transport and the CLI summary both write there.
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_DIR: &str = "logs";
const LOG_FILE_ENV: &str = "SMARTGIST_LOG_FILE";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber for `component` (for example `smartgist-mcp`).
///
/// `RUST_LOG` controls filtering and defaults to `info`. A second call is a no-op.
pub fn init_tracing(component: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = file_writer(component).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

/// Where `component` writes its log file.
pub(crate) fn log_file_path(component: &str, override_path: Option<&str>) -> PathBuf {
    match override_path.map(str::trim).filter(|path| !path.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => Path::new(LOG_DIR).join(format!("{component}.log")),
    }
}

fn file_writer(component: &str) -> Option<NonBlocking> {
    if LOG_GUARD.get().is_some() {
        return None;
    }

    let override_path = std::env::var(LOG_FILE_ENV).ok();
    let path = log_file_path(component, override_path.as_deref());
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name()?;

    if let Err(err) = std::fs::create_dir_all(&directory) {
        eprintln!("Cannot create log directory {}: {err}", directory.display());
        return None;
    }

    let appender = tracing_appender::rolling::never(&directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
