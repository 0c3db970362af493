//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, sync and file exchange into use-case APIs.
//! - Keep front-end layers decoupled from storage and network details.

pub mod quote_service;
