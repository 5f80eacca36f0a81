use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/super-tidy.log";

/// Engine and CLI at `info`; SQLite chatter only when something is wrong.
const DEFAULT_FILTER: &str = "info,super_tidy_core=info,super_tidy=info,rusqlite=warn";

/// Console gets compact one-line events; the log file also records which
/// worker thread (`fingerprint-N`) emitted each line. Keep the returned guard
/// alive for the whole run or buffered file lines are lost.
pub fn init_logger() -> WorkerGuard {
    let requested = env::var("TRACING_LEVEL").ok();
    let (filter, rejected) = match requested.as_deref().map(EnvFilter::try_new) {
        Some(Ok(filter)) => (filter, None),
        Some(Err(e)) => (EnvFilter::new(DEFAULT_FILTER), Some(e)),
        None => (EnvFilter::new(DEFAULT_FILTER), None),
    };

    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (directory, file_name) = split_log_path(Path::new(&log_file_path));
    let file_appender = tracing_appender::rolling::never(&directory, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console = fmt::layer()
        .with_writer(std::io::stdout)
        .compact()
        .with_target(false)
        .without_time();
    let file = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .init();

    if let Some(e) = rejected {
        warn!("Ignoring TRACING_LEVEL ({}); using \"{}\"", e, DEFAULT_FILTER);
    }
    info!("Writing log file {}", directory.join(&file_name).display());

    guard
}

/// Split a log file path into the directory the appender writes under and
/// the file name. A bare file name lands in the working directory.
fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .map_or_else(|| OsString::from("super-tidy.log"), |n| n.to_os_string());
    (directory, file_name)
}
