//! Error types for sheet-schema.
//!
//! All fallible operations in the crate return [`SchemaError`]. Validation
//! findings on an inferred schema are *not* errors: they travel as warning
//! strings alongside a successful result.

use thiserror::Error;

/// The main error type for sheet-schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The uploaded file could not be decoded (unknown extension, malformed
    /// or empty content). Raised before any schema work happens.
    #[error("Unsupported input '{filename}': {reason}")]
    UnsupportedInput {
        /// Name of the uploaded file
        filename: String,
        /// Why the decoder rejected it
        reason: String,
    },

    /// No session exists with the given id.
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// The session exists but has no table with the given name.
    #[error("Table '{table}' not found in session '{session}'")]
    TableNotFound { session: String, table: String },

    /// A referenced column does not exist in its table.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Bulk reset was requested while the registry is empty.
    #[error("No active sessions")]
    NoActiveSessions,

    /// Accept/reject named a `(from, to)` pair that is not pending.
    #[error("Suggested link {from} -> {to} not found")]
    SuggestionNotFound { from: String, to: String },

    /// A table with the same name is already part of the session.
    #[error("Table '{table}' already exists in session")]
    TableAlreadyExists { table: String },

    /// A `table.column` reference could not be parsed.
    #[error("Invalid column reference: {0}")]
    InvalidReference(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, SchemaError>`.
pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    /// Creates an unsupported input error.
    pub fn unsupported_input(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Creates a table-not-found error.
    pub fn table_not_found(session: impl Into<String>, table: impl Into<String>) -> Self {
        Self::TableNotFound {
            session: session.into(),
            table: table.into(),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a suggestion-not-found error.
    pub fn suggestion_not_found(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::SuggestionNotFound {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns true for every member of the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_)
                | Self::TableNotFound { .. }
                | Self::ColumnNotFound { .. }
                | Self::NoActiveSessions
                | Self::SuggestionNotFound { .. }
        )
    }

    /// Returns true when the caller sent something the service cannot use.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedInput { .. } | Self::InvalidReference(_) | Self::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<SchemaError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            SchemaError::Internal(inner) => SchemaError::Internal(format!("{msg}: {inner}")),
            other => SchemaError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                SchemaError::Internal(inner) => SchemaError::Internal(format!("{msg}: {inner}")),
                other => SchemaError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
