use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column '{column}' in {origin}")]
    MissingColumn { origin: String, column: String },

    #[error("Line {line} of {origin}: expected {expected} fields, saw {found}")]
    TooManyFields {
        origin: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column '{column}' in {origin}")]
    DuplicateColumn { origin: String, column: String },

    #[error("Join key '{key}' is {left:?} in messages but {right:?} in categories")]
    JoinKeyType {
        key: String,
        left: crate::types::ColumnType,
        right: crate::types::ColumnType,
    },

    #[error("Row {row}: category string is missing")]
    MissingCategories { row: usize },

    #[error("Row {row}: expected {expected} category tokens (from row 0), found {found}")]
    CategoryMisalignment {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}: category '{category}' has non-numeric value '{raw}'")]
    CategoryValue {
        row: usize,
        category: String,
        raw: String,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;
