//! Persistent key-value storage contracts.
//!
//! # Responsibility
//! - Define the durable/session key-value contract consumed by the repository.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - Each call is independently durable before returning; there is no
//!   multi-key atomicity.
//! - Session values are visible only to the session that wrote them.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryKeyValueStore;
pub use sqlite_store::{SqliteKeyValueStore, DEFAULT_SESSION_ID};

/// Durable key holding the JSON-encoded quote list.
pub const QUOTES_KEY: &str = "quotes";
/// Durable key holding the selected category filter.
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
/// Session key holding the last viewed quote.
pub const LAST_VIEWED_QUOTE_KEY: &str = "lastViewedQuote";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidKey(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey(key) => write!(f, "invalid storage key: `{key}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable + session scoped string storage.
pub trait KeyValueStore: Send {
    /// Reads a value that survives process restarts.
    fn get_durable(&self, key: &str) -> StoreResult<Option<String>>;
    /// Writes a value that survives process restarts.
    fn set_durable(&mut self, key: &str, value: &str) -> StoreResult<()>;
    /// Reads a value scoped to the current session.
    fn get_session(&self, key: &str) -> StoreResult<Option<String>>;
    /// Writes a value scoped to the current session.
    fn set_session(&mut self, key: &str, value: &str) -> StoreResult<()>;
    /// Ends the current session, dropping all session-scoped values.
    fn clear_session(&mut self) -> StoreResult<()>;
}

fn validate_key(key: &str) -> StoreResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}
