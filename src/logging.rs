//! Tracing setup.
//!
//! Each launch logs to stdout and to its own file in the `logs` folder of the
//! app root. Only the newest [`KEEP_LOG_FILES`] launch logs are kept.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Launch logs kept after pruning, including the current one.
pub const KEEP_LOG_FILES: usize = 10;
const LOG_PREFIX: &str = "tweet_tagger";
const LOG_EXTENSION: &str = "log";
/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info,tweet_tagger=debug";

static WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Could not resolve the log folder: {0}")]
    LogDir(#[from] AppDirError),
    /// Creating the launch log, listing the folder or deleting an old log failed.
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("A global tracing subscriber is already installed: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

impl LoggingError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }
}

/// Install the global subscriber. Later calls return immediately.
///
/// Returns the path of this launch's log file.
pub fn init() -> Result<Option<PathBuf>, LoggingError> {
    if WRITER_GUARD.get().is_some() {
        return Ok(None);
    }
    let dir = app_dirs::logs_dir()?;
    let file_name = launch_log_name(local_now())?;
    let path = dir.join(&file_name);
    fs::File::create(&path).map_err(LoggingError::io("create", &path))?;
    prune_launch_logs(&dir, KEEP_LOG_FILES)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, &file_name));
    let timer = local_timer();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_timer(timer.clone()).with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = WRITER_GUARD.set(guard);

    tracing::info!("Writing log to {}", path.display());
    Ok(Some(path))
}

fn launch_log_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP: &[FormatItem<'_>] =
        format_description!("[year][month][day]-[hour][minute][second]");
    Ok(format!("{LOG_PREFIX}-{}.{LOG_EXTENSION}", now.format(STAMP)?))
}

/// Delete the oldest launch logs in `dir` until `keep` remain.
///
/// Files that do not look like launch logs are left alone.
fn prune_launch_logs(dir: &Path, keep: usize) -> Result<usize, LoggingError> {
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir).map_err(LoggingError::io("list", dir))? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !is_launch_log(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        logs.push((modified, path));
    }
    let excess = logs.len().saturating_sub(keep);
    logs.sort();
    for (_, path) in logs.iter().take(excess) {
        fs::remove_file(path).map_err(LoggingError::io("remove", path))?;
    }
    Ok(excess)
}

fn is_launch_log(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|ext| ext == LOG_EXTENSION)
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_PREFIX))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const LINE_STAMP: &[FormatItem<'static>] =
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, LINE_STAMP.into())
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
