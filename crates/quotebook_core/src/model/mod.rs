//! Quote domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Deduplication identity is the quote text, never the category.

pub mod quote;
