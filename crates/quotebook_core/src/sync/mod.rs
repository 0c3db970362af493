//! Remote synchronization.
//!
//! # Responsibility
//! - Adapt the remote quote collection (`remote`).
//! - Merge remote candidates into local state (`reconcile`).
//! - Coordinate fetch + merge + persist cycles (`engine`).
//!
//! # Invariants
//! - Merging is pure and synchronous; suspension happens only at network I/O
//!   and timer boundaries.

pub mod engine;
pub mod reconcile;
pub mod remote;
