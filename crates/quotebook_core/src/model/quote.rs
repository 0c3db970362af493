//! Quote domain model.
//!
//! # Responsibility
//! - Define the canonical `(text, category)` record shared by storage, sync
//!   and file exchange.
//! - Validate user-entered fields before they reach the repository.
//!
//! # Invariants
//! - Identity is the `text` field alone (exact, case-sensitive).
//! - Records are immutable once created; there is no edit path.
//! - `Quote::new` trims both fields and rejects empty values.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Category label assigned to every record obtained from the remote source.
pub const REMOTE_CATEGORY: &str = "Server";

/// Sentinel category value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Canonical note-card record.
///
/// Missing JSON fields deserialize as empty strings so imported files are
/// accepted without per-record shape checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// Quote body. Used as the deduplication identity.
    #[serde(default)]
    pub text: String,
    /// Free-form category label.
    #[serde(default)]
    pub category: String,
}

impl Quote {
    /// Creates a validated quote from raw user input.
    ///
    /// # Errors
    /// - `ValidationError::EmptyText` when `text` is blank after trimming.
    /// - `ValidationError::EmptyCategory` when `category` is blank after trimming.
    pub fn new(text: &str, category: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        let category = category.trim();
        match (text.is_empty(), category.is_empty()) {
            (true, true) => Err(ValidationError::EmptyFields),
            (true, false) => Err(ValidationError::EmptyText),
            (false, true) => Err(ValidationError::EmptyCategory),
            (false, false) => Ok(Self {
                text: text.to_string(),
                category: category.to_string(),
            }),
        }
    }

    /// Builds a record without validation.
    ///
    /// Used by remote mapping and import paths where the source owns the shape.
    pub fn unchecked(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Returns whether this quote belongs to `category`, ignoring case.
    pub fn in_category(&self, category: &str) -> bool {
        self.category == category || self.category.to_lowercase() == category.to_lowercase()
    }
}

impl Display for Quote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" - {}", self.text, self.category)
    }
}

/// Input validation failure for quote creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyText,
    EmptyCategory,
    EmptyFields,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "quote text cannot be empty"),
            Self::EmptyCategory => write!(f, "quote category cannot be empty"),
            Self::EmptyFields => write!(f, "please fill in both fields"),
        }
    }
}

impl Error for ValidationError {}

/// Category filter used by browse and random-pick operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// No filter; every record matches.
    #[default]
    All,
    /// Case-insensitive match against one category label.
    Named(String),
}

impl CategoryFilter {
    /// Parses a stored or user-entered filter value.
    ///
    /// Blank input and the `all` sentinel (any case) map to `CategoryFilter::All`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_CATEGORIES) {
            Self::All
        } else {
            Self::Named(trimmed.to_string())
        }
    }

    /// Returns the persisted form of this filter.
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Named(value) => value.as_str(),
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            Self::All => true,
            Self::Named(category) => quote.in_category(category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryFilter, Quote, ValidationError};

    #[test]
    fn new_trims_fields() {
        let quote = Quote::new("  Hello  ", " Wisdom ").expect("valid quote");
        assert_eq!(quote.text, "Hello");
        assert_eq!(quote.category, "Wisdom");
    }

    #[test]
    fn new_rejects_blank_fields() {
        assert_eq!(Quote::new("", "x"), Err(ValidationError::EmptyText));
        assert_eq!(Quote::new("x", "  "), Err(ValidationError::EmptyCategory));
        assert_eq!(Quote::new(" ", ""), Err(ValidationError::EmptyFields));
    }

    #[test]
    fn filter_parse_maps_sentinel_and_blank_to_all() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("All"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(" ALL "), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("   "), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(" Work "),
            CategoryFilter::Named("Work".to_string())
        );
    }

    #[test]
    fn named_filter_ignores_case() {
        let quote = Quote::unchecked("Hi", "Wisdom");
        assert!(CategoryFilter::parse("WISDOM").matches(&quote));
        assert!(!CategoryFilter::parse("work").matches(&quote));
    }

    #[test]
    fn named_filter_folds_non_ascii_case() {
        let quote = Quote::unchecked("Soleil", "Été");
        assert!(CategoryFilter::parse("ÉTÉ").matches(&quote));
        assert!(CategoryFilter::parse("été").matches(&quote));
        assert!(!CategoryFilter::parse("ete").matches(&quote));
    }

    #[test]
    fn missing_json_fields_default_to_empty() {
        let quote: Quote = serde_json::from_str(r#"{"text":"only text"}"#).expect("lenient parse");
        assert_eq!(quote.text, "only text");
        assert!(quote.category.is_empty());
    }

    #[test]
    fn display_matches_rendered_form() {
        let quote = Quote::unchecked("Hi", "A");
        assert_eq!(quote.to_string(), "\"Hi\" - A");
    }
}
