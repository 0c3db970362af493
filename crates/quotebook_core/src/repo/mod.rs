//! Repository layer over key-value persistence.
//!
//! # Responsibility
//! - Own the session's quote collection and its write-through policy.
//! - Isolate storage keys and encoding from service orchestration.

pub mod quote_repo;
