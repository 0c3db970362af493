//! Process logging for quotebook front ends.
//!
//! # Responsibility
//! - Start one rolling-file logger per process and reject attempts to
//!   retarget it.
//! - Record the resolved runtime configuration once at startup.
//! - Turn panics into a single `event=panic_captured` line.
//!
//! # Invariants
//! - Quote text is never logged; events carry counts, ids and status only.
//! - Initialization never panics.

use crate::config::QuotebookConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "quotebook";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Where and how verbosely the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

impl LogTarget {
    /// Validates a user-supplied level name and log directory.
    ///
    /// `warning` is accepted as an alias of `warn`; the directory must be
    /// absolute.
    pub fn parse(level: &str, dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        let name = level.trim();
        let level = if name.eq_ignore_ascii_case("warning") {
            LevelFilter::Warn
        } else {
            LevelFilter::from_str(name)
                .map_err(|_| LoggingError::UnsupportedLevel(name.to_string()))?
        };

        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() || !dir.is_absolute() {
            return Err(LoggingError::RelativeDir(dir.to_path_buf()));
        }

        Ok(Self {
            level,
            dir: dir.to_path_buf(),
        })
    }
}

/// Logging bootstrap failure.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// The process logger is already running with another target.
    AlreadyActive {
        active: LogTarget,
        requested: LogTarget,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(name) => write!(
                f,
                "unsupported log level `{name}`; expected off|error|warn|info|debug|trace"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                dir.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyActive { active, requested } => write!(
                f,
                "logging already active at `{}` ({}); refusing `{}` ({})",
                active.dir.display(),
                active.level,
                requested.dir.display(),
                requested.level
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts file logging, or confirms the running logger matches.
///
/// # Errors
/// - Invalid level or relative directory.
/// - Directory creation or backend startup failure.
/// - `AlreadyActive` when a different level or directory is requested.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let requested = LogTarget::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(requested.clone()))?;
    if active.target != requested {
        return Err(LoggingError::AlreadyActive {
            active: active.target.clone(),
            requested,
        });
    }
    Ok(())
}

/// Level used when none is configured: `debug` in debug builds, else `info`.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Records the resolved configuration as an `app_start` event.
pub fn log_startup(config: &QuotebookConfig) {
    info!(
        "event=app_start module=logging status=ok version={} session={} db={} remote={} fetch_limit={} sync_interval_s={}",
        env!("CARGO_PKG_VERSION"),
        config.session_id,
        config.db_path.display(),
        config.remote.endpoint,
        config.remote.fetch_limit,
        config.sync_interval.as_secs()
    );
}

fn start(target: LogTarget) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&target.dir).map_err(|source| LoggingError::CreateDir {
        dir: target.dir.clone(),
        source,
    })?;

    let levels = LogSpecification::builder().default(target.level).build();
    let handle = Logger::with(levels)
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=logging_init module=logging status=ok os={} level={} log_dir={}",
        std::env::consts::OS,
        target.level,
        target.dir.display()
    );

    Ok(ActiveLogger {
        target,
        _handle: handle,
    })
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_summary(&payload)
        );
        previous(info);
    }));
}

/// Single-line, length-capped form of a panic message.
fn panic_summary(message: &str) -> String {
    let flat = message.replace(['\n', '\r'], " ");
    match flat.char_indices().nth(PANIC_SUMMARY_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
