//! Error types for counterflow

use std::fmt;

/// Result type alias for counterflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for counterflow
///
/// Ingestion itself never fails: rows with problems are skipped and logged.
/// These values surface only from the table lookup contract, from record
/// field access, and from configuration parsing.
#[derive(Debug)]
pub enum Error {
    /// A table cell was looked up but never written
    CellNotFound { row: String, column: String },
    /// A required field is absent from a record
    MissingField(String),
    /// A field is present but cannot be parsed as the expected type
    InvalidValue { field: String, value: String },
    /// Configuration errors
    Config(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CellNotFound { row, column } => {
                write!(f, "no value stored at row '{}', column '{}'", row, column)
            }
            Error::MissingField(field) => write!(f, "required field '{}' is missing", field),
            Error::InvalidValue { field, value } => {
                write!(f, "field '{}' holds unparseable value '{}'", field, value)
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::CellNotFound {
            row: "2024-01-01 00:00:00".to_string(),
            column: "vol0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("2024-01-01 00:00:00"));
        assert!(msg.contains("vol0"));

        let err = Error::MissingField("timestamp".to_string());
        assert!(format!("{}", err).contains("timestamp"));
    }
}
