//! Core domain logic for Quotebook.
//! This crate is the single source of truth for quote storage, sync and
//! exchange invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;
pub mod transfer;

pub use config::{QuotebookConfig, RemoteConfig};
pub use logging::{default_log_level, init_logging, log_startup, LogTarget, LoggingError};
pub use model::quote::{CategoryFilter, Quote, ValidationError, ALL_CATEGORIES, REMOTE_CATEGORY};
pub use repo::quote_repo::{seed_quotes, QuoteRepository, RepoError, RepoResult};
pub use service::quote_service::{QuoteService, ServiceError};
pub use store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError};
pub use sync::engine::{CycleOutcome, CycleReport, CycleState, SyncEngine};
pub use sync::reconcile::{reconcile, MergeResult};
pub use sync::remote::{FetchOutcome, HttpRemoteSource, RemoteError, RemoteSource};
pub use transfer::{export_json, parse_import, ImportError, DEFAULT_EXPORT_FILE_NAME};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
