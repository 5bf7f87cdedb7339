//! Schema inference: decoder evidence in, [`Table`] with exactly one primary
//! key and a list of validation warnings out.
//!
//! Warnings never fail inference. They are returned with the table so the
//! caller can show them next to the schema.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::normalizer::{NormalizedColumn, RenameReason};
use super::{Column, SemanticType, Table};

/// Name of the synthetic key column.
pub const SURROGATE_KEY_NAME: &str = "id";

/// Warning attached to a table that received a synthetic key.
pub const SURROGATE_KEY_WARNING: &str = "Auto-added 'id' column as primary key";

/// Warning attached to a table whose own `id` column was promoted to key.
pub const EXISTING_KEY_WARNING: &str = "Existing 'id' column used as primary key";

/// Per-column evidence supplied by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEvidence {
    pub column: NormalizedColumn,
    pub semantic_type: SemanticType,
    /// True iff at least one sampled value was absent.
    pub nullable: bool,
}

impl ColumnEvidence {
    pub fn name(&self) -> &str {
        &self.column.normalized_name
    }
}

/// How the primary key is chosen before the surrogate-key fallback runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "column")]
pub enum PrimaryKeyHint {
    /// The first data column is the key.
    #[default]
    FirstColumn,
    /// The column with this canonical or original name is the key. When no
    /// such column exists the surrogate fallback applies.
    Named(String),
    /// An explicit `id` column was requested; no data column is the key.
    Surrogate,
}

/// Options for [`SchemaInferencer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceOptions {
    #[serde(default)]
    pub primary_key: PrimaryKeyHint,
}

impl InferenceOptions {
    pub fn with_primary_key(mut self, hint: PrimaryKeyHint) -> Self {
        self.primary_key = hint;
        self
    }
}

/// Builds table schemas from decoder evidence.
#[derive(Debug, Clone, Default)]
pub struct SchemaInferencer {
    options: InferenceOptions,
}

impl SchemaInferencer {
    pub fn new(options: InferenceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    /// Infers the column list for `table_name`.
    ///
    /// The returned table has no row count or preview; those come from the
    /// decoded data, not from the schema.
    #[instrument(skip(self, evidence), fields(columns = evidence.len()))]
    pub fn infer(&self, table_name: &str, evidence: &[ColumnEvidence]) -> Table {
        let mut key_assigned = false;
        let mut columns: Vec<Column> = evidence
            .iter()
            .enumerate()
            .map(|(idx, ev)| {
                let is_primary_key = !key_assigned
                    && match &self.options.primary_key {
                        PrimaryKeyHint::FirstColumn => idx == 0,
                        PrimaryKeyHint::Named(wanted) => {
                            ev.column.normalized_name == *wanted
                                || ev.column.original_name == *wanted
                        }
                        PrimaryKeyHint::Surrogate => false,
                    };
                key_assigned |= is_primary_key;
                Column {
                    name: ev.column.normalized_name.clone(),
                    original_name: Some(ev.column.original_name.clone()),
                    inferred_type: ev.semantic_type,
                    nullable: ev.nullable,
                    is_primary_key,
                    was_reserved: ev.column.was_reserved,
                    rename_reason: ev.column.rename_reason,
                }
            })
            .collect();

        let mut warnings = ensure_primary_key(&mut columns);
        warnings.extend(validate_schema(&columns));

        debug!(
            table = table_name,
            primary_key = columns
                .iter()
                .find(|c| c.is_primary_key)
                .map(|c| c.name.as_str())
                .unwrap_or_default(),
            warnings = warnings.len(),
            "Inferred table schema"
        );

        let mut table = Table::new(table_name, columns);
        table.validation_warnings = warnings;
        table
    }
}

/// Guarantees exactly one primary key.
///
/// Without any key, an existing `id` column becomes the key; failing that a
/// surrogate `id` column is inserted at position 0. With several keys, the
/// first keeps the flag and the rest lose it.
pub fn ensure_primary_key(columns: &mut Vec<Column>) -> Vec<String> {
    let mut warnings = Vec::new();

    if !columns.iter().any(|c| c.is_primary_key) {
        match columns.iter_mut().find(|c| c.name == SURROGATE_KEY_NAME) {
            Some(existing) => {
                existing.is_primary_key = true;
                existing.nullable = false;
                warnings.push(EXISTING_KEY_WARNING.to_string());
            }
            None => {
                columns.insert(0, Column::surrogate_key(SURROGATE_KEY_NAME));
                warnings.push(SURROGATE_KEY_WARNING.to_string());
            }
        }
    }

    let mut seen_key = false;
    for column in columns.iter_mut().filter(|c| c.is_primary_key) {
        if seen_key {
            column.is_primary_key = false;
            warnings.push(format!(
                "Column '{}' is no longer a primary key (only one is allowed)",
                column.name
            ));
        }
        seen_key = true;
    }

    warnings
}

/// Non-blocking schema checks.
pub fn validate_schema(columns: &[Column]) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::with_capacity(columns.len());
    let mut duplicates: Vec<&str> = Vec::new();
    for column in columns {
        if !seen.insert(column.name.as_str()) && !duplicates.contains(&column.name.as_str()) {
            duplicates.push(column.name.as_str());
        }
    }
    for name in duplicates {
        warnings.push(format!("Duplicate column name '{name}' remains in schema"));
    }

    for column in columns.iter().filter(|c| c.was_reserved) {
        let original = column.original_name.as_deref().unwrap_or(&column.name);
        let reason = match column.rename_reason {
            Some(RenameReason::Duplicate) => "duplicate name",
            _ => "reserved keyword",
        };
        warnings.push(format!(
            "Column '{original}' renamed to '{}' ({reason})",
            column.name
        ));
    }

    if !columns.iter().any(|c| c.is_primary_key) {
        error!("Schema reached validation without a primary key");
        warnings.push("No primary key defined in schema".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnNormalizer;

    fn evidence(headers: &[&str], types: &[SemanticType]) -> Vec<ColumnEvidence> {
        ColumnNormalizer::new()
            .normalize(headers)
            .into_iter()
            .zip(types.iter().copied())
            .map(|(column, semantic_type)| ColumnEvidence {
                column,
                semantic_type,
                nullable: false,
            })
            .collect()
    }

    fn key_names(table: &Table) -> Vec<&str> {
        table.primary_keys().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_first_column_is_key_by_default() {
        let ev = evidence(
            &["Customer ID", "Name"],
            &[SemanticType::Integer, SemanticType::Text],
        );
        let table = SchemaInferencer::default().infer("customers", &ev);

        assert_eq!(table.columns.len(), 2);
        assert_eq!(key_names(&table), vec!["customer_id"]);
        assert_eq!(table.columns[0].original_name.as_deref(), Some("Customer ID"));
        assert_eq!(table.columns[0].inferred_type, SemanticType::Integer);
        assert!(table.validation_warnings.is_empty());
    }

    #[test]
    fn test_surrogate_when_explicit_id_requested() {
        let ev = evidence(&["name"], &[SemanticType::Text]);
        let inferencer = SchemaInferencer::new(
            InferenceOptions::default().with_primary_key(PrimaryKeyHint::Surrogate),
        );
        let table = inferencer.infer("people", &ev);

        assert_eq!(table.columns.len(), 2);
        let id = &table.columns[0];
        assert_eq!(id.name, "id");
        assert_eq!(id.inferred_type, SemanticType::Integer);
        assert!(!id.nullable);
        assert!(id.is_primary_key);
        assert!(id.original_name.is_none());
        assert_eq!(key_names(&table), vec!["id"]);
        assert_eq!(table.validation_warnings, vec![SURROGATE_KEY_WARNING.to_string()]);
    }

    #[test]
    fn test_named_key_by_original_header() {
        let ev = evidence(
            &["Name", "Email Address"],
            &[SemanticType::Text, SemanticType::Text],
        );
        let inferencer = SchemaInferencer::new(
            InferenceOptions::default()
                .with_primary_key(PrimaryKeyHint::Named("Email Address".to_string())),
        );
        let table = inferencer.infer("people", &ev);
        assert_eq!(key_names(&table), vec!["email_address"]);
    }

    #[test]
    fn test_missing_named_key_falls_back_to_surrogate() {
        let ev = evidence(&["name"], &[SemanticType::Text]);
        let inferencer = SchemaInferencer::new(
            InferenceOptions::default().with_primary_key(PrimaryKeyHint::Named("sku".to_string())),
        );
        let table = inferencer.infer("items", &ev);
        assert_eq!(key_names(&table), vec!["id"]);
        assert_eq!(table.columns[0].name, "id");
    }

    #[test]
    fn test_existing_id_column_is_promoted_instead_of_duplicated() {
        let ev = evidence(&["name", "ID"], &[SemanticType::Text, SemanticType::Integer]);
        for hint in [
            PrimaryKeyHint::Surrogate,
            PrimaryKeyHint::Named("sku".to_string()),
        ] {
            let inferencer =
                SchemaInferencer::new(InferenceOptions::default().with_primary_key(hint));
            let table = inferencer.infer("people", &ev);

            let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["name", "id"]);
            assert_eq!(key_names(&table), vec!["id"]);
            assert!(!table.columns[1].nullable);
            assert_eq!(table.columns[1].original_name.as_deref(), Some("ID"));
            assert_eq!(
                table.validation_warnings,
                vec![EXISTING_KEY_WARNING.to_string()]
            );
        }
    }

    #[test]
    fn test_empty_table_gets_surrogate() {
        let table = SchemaInferencer::default().infer("empty", &[]);
        assert_eq!(table.columns.len(), 1);
        assert_eq!(key_names(&table), vec!["id"]);
        assert!(table
            .validation_warnings
            .contains(&SURROGATE_KEY_WARNING.to_string()));
    }

    #[test]
    fn test_reserved_rename_warning() {
        let ev = evidence(
            &["Key", "Select Date"],
            &[SemanticType::Integer, SemanticType::Datetime],
        );
        let table = SchemaInferencer::default().infer("events", &ev);
        let col = table.column("select_date_col").unwrap();
        assert!(col.was_reserved);
        assert!(table.validation_warnings.contains(
            &"Column 'Select Date' renamed to 'select_date_col' (reserved keyword)".to_string()
        ));
    }

    #[test]
    fn test_duplicate_rename_warning() {
        let ev = evidence(&["a", "A"], &[SemanticType::Text, SemanticType::Text]);
        let table = SchemaInferencer::default().infer("t", &ev);
        assert_eq!(
            table.validation_warnings,
            vec!["Column 'A' renamed to 'a_1' (duplicate name)".to_string()]
        );
    }

    #[test]
    fn test_ensure_primary_key_demotes_extra_keys() {
        let mut columns = vec![
            Column::surrogate_key("a"),
            Column::surrogate_key("b"),
            Column::surrogate_key("c"),
        ];
        let warnings = ensure_primary_key(&mut columns);
        assert_eq!(columns.iter().filter(|c| c.is_primary_key).count(), 1);
        assert!(columns[0].is_primary_key);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_validate_schema_flags_residual_duplicates_and_missing_key() {
        let mut plain = Column::surrogate_key("id");
        plain.is_primary_key = false;
        let columns = vec![plain.clone(), plain];
        let warnings = validate_schema(&columns);
        assert!(warnings.contains(&"Duplicate column name 'id' remains in schema".to_string()));
        assert!(warnings.contains(&"No primary key defined in schema".to_string()));
    }

    #[test]
    fn test_surrogate_next_to_existing_id_column_is_reported() {
        let ev = evidence(&["name", "id"], &[SemanticType::Text, SemanticType::Integer]);
        let inferencer = SchemaInferencer::new(
            InferenceOptions::default().with_primary_key(PrimaryKeyHint::Surrogate),
        );
        let table = inferencer.infer("t", &ev);
        assert_eq!(key_names(&table), vec!["id"]);
        assert!(table
            .validation_warnings
            .contains(&"Duplicate column name 'id' remains in schema".to_string()));
    }
}
