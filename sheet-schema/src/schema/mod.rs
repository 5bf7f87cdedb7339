//! Table and column model plus the inference steps that build it.
//!
//! - [`normalizer`]: raw headers to canonical identifiers
//! - [`inference`]: column list, primary-key guarantee and validation warnings
//! - [`types`]: semantic type tags and their SQL/ORM spellings

pub mod inference;
pub mod normalizer;
pub mod types;

use serde::{Deserialize, Serialize};

pub use inference::{
    ensure_primary_key, validate_schema, ColumnEvidence, InferenceOptions, PrimaryKeyHint,
    SchemaInferencer, EXISTING_KEY_WARNING, SURROGATE_KEY_NAME, SURROGATE_KEY_WARNING,
};
pub use normalizer::{ColumnNormalizer, NormalizedColumn, RenameReason};
pub use types::SemanticType;

/// A single inferred column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Canonical identifier, unique within the table.
    pub name: String,
    /// Header as it appeared in the source file; `None` for synthetic columns.
    pub original_name: Option<String>,
    pub inferred_type: SemanticType,
    pub nullable: bool,
    pub is_primary_key: bool,
    /// The canonical name had to be changed because of a reserved keyword or
    /// a duplicate.
    pub was_reserved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_reason: Option<RenameReason>,
}

impl Column {
    /// Synthetic integer surrogate key.
    pub fn surrogate_key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original_name: None,
            inferred_type: SemanticType::Integer,
            nullable: false,
            is_primary_key: true,
            was_reserved: false,
            rename_reason: None,
        }
    }
}

/// A table as registered in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub row_count: Option<usize>,
    #[serde(default)]
    pub row_preview: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
    #[serde(default)]
    pub validation_warnings: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            row_count: None,
            row_preview: None,
            validation_warnings: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.primary_keys().next()
    }
}
