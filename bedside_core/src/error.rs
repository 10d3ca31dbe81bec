//! Error types for the bedside_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bedside_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Field path does not name a field on a bed record
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Field exists but is computed or immutable
    #[error("Field is read-only: {0}")]
    ReadOnlyField(String),

    /// Value could not be parsed into the field's type
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A platform capability (audio, wake lock, vibration) is not available
    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    /// No shift note with the given id
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
