//! SQLite-backed key-value store.
//!
//! # Responsibility
//! - Persist durable values in `durable_kv`.
//! - Persist session values in `session_kv`, partitioned by session id.
//!
//! # Invariants
//! - Every write is an autocommit upsert; no write-behind buffering.
//! - A store only reads and clears rows of its own session id.
//! - A session lives until `clear_session`; rows are never expired, so a
//!   reused session id (including `default`) sees values from earlier runs.

use super::{validate_key, KeyValueStore, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Session id used when the caller does not provide one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// SQLite key-value store bound to one session id.
pub struct SqliteKeyValueStore {
    conn: Connection,
    session_id: String,
}

impl SqliteKeyValueStore {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, session_id: &str) -> StoreResult<Self> {
        let conn = open_db(path)?;
        Self::from_connection(conn, session_id)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory(session_id: &str) -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn, session_id)
    }

    /// Wraps a migrated connection.
    pub fn from_connection(conn: Connection, session_id: &str) -> StoreResult<Self> {
        let session_id = normalize_session_id(session_id)?;
        debug!("event=store_open module=store status=ok session_id={session_id}");
        Ok(Self { conn, session_id })
    }

    /// Returns the active session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_durable(&self, key: &str) -> StoreResult<Option<String>> {
        let key = validate_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM durable_kv WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_durable(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let key = validate_key(key)?;
        self.conn.execute(
            "INSERT INTO durable_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        debug!(
            "event=kv_write module=store status=ok scope=durable key={} bytes={}",
            key,
            value.len()
        );
        Ok(())
    }

    fn get_session(&self, key: &str) -> StoreResult<Option<String>> {
        let key = validate_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM session_kv WHERE session_id = ?1 AND key = ?2;",
                params![self.session_id, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_session(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let key = validate_key(key)?;
        self.conn.execute(
            "INSERT INTO session_kv (session_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![self.session_id, key, value],
        )?;
        debug!(
            "event=kv_write module=store status=ok scope=session key={} bytes={}",
            key,
            value.len()
        );
        Ok(())
    }

    fn clear_session(&mut self) -> StoreResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM session_kv WHERE session_id = ?1;",
            [self.session_id.as_str()],
        )?;
        info!(
            "event=session_clear module=store status=ok session_id={} removed={}",
            self.session_id, removed
        );
        Ok(())
    }
}

fn normalize_session_id(value: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidKey(value.to_string()));
    }
    Ok(trimmed.to_string())
}
