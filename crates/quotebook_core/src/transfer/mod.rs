//! JSON file exchange for quote collections.
//!
//! # Responsibility
//! - Render the repository as a pretty-printed JSON array.
//! - Parse imported JSON separately from reading the file, so the
//!   parse-and-apply step is testable without a file picker.
//!
//! # Invariants
//! - Import is all-or-nothing: any parse error rejects the whole file.
//! - Import performs no deduplication and no per-record field checks.

use crate::model::quote::Quote;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// File name used when the caller does not pick one.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "quotes.json";

/// Import failure. Nothing is applied when one is returned.
#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    NotAnArray(&'static str),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read import file: {err}"),
            Self::Parse(err) => write!(f, "import file is not valid quote JSON: {err}"),
            Self::NotAnArray(kind) => {
                write!(f, "import file must contain a JSON array, found {kind}")
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::NotAnArray(_) => None,
        }
    }
}

/// Renders quotes as a 2-space indented JSON array.
pub fn export_json(quotes: &[Quote]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(quotes)
}

/// Parses import content into quote records.
///
/// Each array element is read as `{text, category}`; missing fields become
/// empty strings.
pub fn parse_import(raw: &str) -> Result<Vec<Quote>, ImportError> {
    let value: Value = serde_json::from_str(raw).map_err(ImportError::Parse)?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ImportError::NotAnArray(json_kind(&other))),
    };

    items
        .into_iter()
        .map(serde_json::from_value::<Quote>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ImportError::Parse)
}

/// Reads and parses an import file.
pub async fn read_import_file(path: impl AsRef<Path>) -> Result<Vec<Quote>, ImportError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(ImportError::Io)?;
    parse_import(&raw)
}

/// Writes `quotes` to `path` as pretty JSON.
pub async fn write_export_file(path: impl AsRef<Path>, quotes: &[Quote]) -> std::io::Result<()> {
    let rendered = export_json(quotes)?;
    tokio::fs::write(path, rendered).await
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{export_json, parse_import, ImportError};
    use crate::model::quote::Quote;

    #[test]
    fn export_is_pretty_printed() {
        let rendered = export_json(&[Quote::unchecked("Hi", "A")]).unwrap();
        assert_eq!(
            rendered,
            "[\n  {\n    \"text\": \"Hi\",\n    \"category\": \"A\"\n  }\n]"
        );
    }

    #[test]
    fn parse_rejects_non_array_content() {
        let err = parse_import(r#"{"text":"Hi","category":"A"}"#).unwrap_err();
        assert!(matches!(err, ImportError::NotAnArray("object")));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(matches!(
            parse_import("[{\"text\": "),
            Err(ImportError::Parse(_))
        ));
    }

    #[test]
    fn parse_accepts_records_with_missing_fields() {
        let parsed = parse_import(r#"[{"text":"Hi"},{"category":"B"},{}]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Quote::unchecked("Hi", ""),
                Quote::unchecked("", "B"),
                Quote::unchecked("", ""),
            ]
        );
    }

    #[test]
    fn parse_rejects_whole_file_on_one_bad_element() {
        let err = parse_import(r#"[{"text":"ok","category":"A"}, 7]"#).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }
}
