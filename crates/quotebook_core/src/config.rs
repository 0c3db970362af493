//! Runtime configuration.
//!
//! # Responsibility
//! - Resolve storage, logging, session and remote settings from environment
//!   variables, with defaults for every value.
//!
//! # Invariants
//! - Resolution never fails; unparsable numbers fall back to defaults.

use log::warn;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REMOTE_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_FETCH_LIMIT: u32 = 5;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_ID: &str = crate::store::DEFAULT_SESSION_ID;

const DB_FILE_NAME: &str = "quotebook.sqlite3";
const LOG_DIR_NAME: &str = "quotebook-logs";

/// Remote endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Collection URL used for both GET (fetch) and POST (publish).
    pub endpoint: String,
    /// Value of the `_limit` query parameter on fetch.
    pub fetch_limit: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

/// Full runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotebookConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub session_id: String,
    pub sync_interval: Duration,
    pub remote: RemoteConfig,
}

impl Default for QuotebookConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DB_FILE_NAME),
            log_dir: std::env::temp_dir().join(LOG_DIR_NAME),
            log_level: crate::logging::default_log_level().to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            remote: RemoteConfig::default(),
        }
    }
}

impl QuotebookConfig {
    /// Resolves configuration from `QUOTEBOOK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            db_path: read("QUOTEBOOK_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_dir: read("QUOTEBOOK_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_level: read("QUOTEBOOK_LOG_LEVEL").unwrap_or(defaults.log_level),
            session_id: read("QUOTEBOOK_SESSION_ID").unwrap_or(defaults.session_id),
            sync_interval: Duration::from_secs(parse_or(
                "QUOTEBOOK_SYNC_INTERVAL_SECS",
                read("QUOTEBOOK_SYNC_INTERVAL_SECS"),
                DEFAULT_SYNC_INTERVAL_SECS,
            )),
            remote: RemoteConfig {
                endpoint: read("QUOTEBOOK_REMOTE_URL").unwrap_or(defaults.remote.endpoint),
                fetch_limit: parse_or(
                    "QUOTEBOOK_FETCH_LIMIT",
                    read("QUOTEBOOK_FETCH_LIMIT"),
                    DEFAULT_FETCH_LIMIT,
                ),
                timeout: Duration::from_secs(parse_or(
                    "QUOTEBOOK_HTTP_TIMEOUT_SECS",
                    read("QUOTEBOOK_HTTP_TIMEOUT_SECS"),
                    DEFAULT_HTTP_TIMEOUT_SECS,
                )),
            },
        }
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            warn!("event=config_parse module=config status=fallback var={name} value={raw}");
            default
        }
    }
}
