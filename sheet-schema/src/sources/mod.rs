//! Decoding uploaded files into Arrow data plus per-column schema evidence.
//!
//! The decoder is the only place that looks at raw bytes. Everything
//! downstream works on [`DecodedTable`]: canonical column names, a semantic
//! type and nullability flag per column, and the record batches themselves.
//!
//! # Example
//!
//! ```rust
//! use sheet_schema::sources::{decode, DecodeOptions};
//! use sheet_schema::schema::SemanticType;
//!
//! let csv = b"Customer ID,Full Name\n1,Ada\n2,Grace\n";
//! let table = decode("Customers.csv", csv, true, &DecodeOptions::default()).unwrap();
//!
//! assert_eq!(table.name(), "customers");
//! assert_eq!(table.columns()[0].name(), "customer_id");
//! assert_eq!(table.columns()[0].semantic_type, SemanticType::Integer);
//! assert_eq!(table.row_count(), 2);
//! ```

mod csv;
pub mod detect;
mod json;

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{Result, SchemaError};
use crate::schema::normalizer::normalize_table_name;
use crate::schema::{ColumnEvidence, ColumnNormalizer, SemanticType};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Picks the format from the file extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileFormat::Csv)
        } else if lower.ends_with(".json") || lower.ends_with(".ndjson") {
            Ok(FileFormat::Json)
        } else if lower.ends_with(".xls") || lower.ends_with(".xlsx") {
            Err(SchemaError::unsupported_input(
                filename,
                "spreadsheet workbooks are not supported, export the sheet as CSV",
            ))
        } else {
            Err(SchemaError::unsupported_input(
                filename,
                "unsupported file type",
            ))
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => f.write_str("csv"),
            FileFormat::Json => f.write_str("json"),
        }
    }
}

/// Options controlling decoding and type detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// CSV field delimiter (default: ',')
    pub delimiter: char,
    /// Maximum records read for Arrow schema inference (default: 1000)
    pub schema_infer_max_records: usize,
    /// Values sampled when refining string columns (default: 1000)
    pub refine_sample_size: usize,
    /// Share of sampled values that must match a pattern (default: 0.9)
    pub refine_threshold: f64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            schema_infer_max_records: 1000,
            refine_sample_size: 1000,
            refine_threshold: 0.9,
        }
    }
}

impl DecodeOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_schema_infer_max_records(mut self, records: usize) -> Self {
        self.schema_infer_max_records = records;
        self
    }

    pub fn with_refine_threshold(mut self, threshold: f64) -> Self {
        self.refine_threshold = threshold;
        self
    }

    pub(crate) fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                SchemaError::Configuration(format!(
                    "CSV delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                ))
            })
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.schema_infer_max_records == 0 {
            return Err(SchemaError::Configuration(
                "schema_infer_max_records must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.refine_threshold) {
            return Err(SchemaError::Configuration(format!(
                "refine_threshold must be within [0, 1], got {}",
                self.refine_threshold
            )));
        }
        Ok(())
    }
}

/// A decoded upload: canonical schema evidence plus the data.
#[derive(Debug, Clone)]
pub struct DecodedTable {
    name: String,
    columns: Vec<ColumnEvidence>,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    row_count: usize,
}

impl DecodedTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnEvidence] {
        &self.columns
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// The first `rows` rows as JSON objects keyed by canonical column name.
    pub fn preview(&self, rows: usize) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        let mut remaining = rows;
        let mut slices = Vec::new();
        for batch in &self.batches {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            slices.push(batch.slice(0, take));
            remaining -= take;
        }

        if slices.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = ArrayWriter::new(Vec::new());
        writer.write_batches(&slices.iter().collect::<Vec<_>>())?;
        writer.finish()?;
        let buf = writer.into_inner();
        Ok(serde_json::from_slice(&buf)?)
    }

    /// Registers the data as an in-memory table named `table_name`.
    pub fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let provider = MemTable::try_new(self.schema.clone(), vec![self.batches.clone()])?;
        ctx.register_table(TableReference::bare(table_name), Arc::new(provider))?;
        Ok(())
    }
}

/// Decodes an uploaded file.
///
/// Failures of any kind surface as [`SchemaError::UnsupportedInput`] so the
/// caller can report them as a client error before any session is touched.
#[instrument(skip(bytes, options), fields(size = bytes.len()))]
pub fn decode(
    filename: &str,
    bytes: &[u8],
    has_headers: bool,
    options: &DecodeOptions,
) -> Result<DecodedTable> {
    let format = FileFormat::from_filename(filename)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(SchemaError::unsupported_input(filename, "file is empty"));
    }

    let (raw_schema, raw_batches) = match format {
        FileFormat::Csv => csv::read_csv(bytes, has_headers, options),
        FileFormat::Json => json::read_json(bytes, options),
    }
    .map_err(|e| SchemaError::unsupported_input(filename, e.to_string()))?;

    let headers: Vec<String> = if has_headers || format == FileFormat::Json {
        raw_schema.fields().iter().map(|f| f.name().clone()).collect()
    } else {
        (1..=raw_schema.fields().len())
            .map(|i| format!("col_{i}"))
            .collect()
    };
    let normalized = ColumnNormalizer::new().normalize(&headers);

    let schema: SchemaRef = Arc::new(Schema::new(
        raw_schema
            .fields()
            .iter()
            .zip(&normalized)
            .map(|(field, col)| Field::new(&col.normalized_name, field.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batches = raw_batches
        .into_iter()
        .map(|batch| RecordBatch::try_new(schema.clone(), batch.columns().to_vec()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let row_count = batches.iter().map(|b| b.num_rows()).sum();

    let columns = normalized
        .into_iter()
        .enumerate()
        .map(|(idx, column)| {
            let arrays: Vec<_> = batches.iter().map(|b| b.column(idx).clone()).collect();
            let data_type = schema.field(idx).data_type();
            let semantic_type = match SemanticType::from_arrow(data_type) {
                SemanticType::Text if is_string_type(data_type) => detect::refine_string_column(
                    &arrays,
                    options.refine_sample_size,
                    options.refine_threshold,
                )
                .unwrap_or(SemanticType::Text),
                other => other,
            };
            ColumnEvidence {
                column,
                semantic_type,
                nullable: detect::has_nulls(&arrays),
            }
        })
        .collect();

    let table = DecodedTable {
        name: table_name_from_filename(filename),
        columns,
        schema,
        batches,
        row_count,
    };
    info!(
        table = table.name(),
        format = %format,
        columns = table.columns.len(),
        rows = table.row_count,
        "Decoded upload"
    );
    Ok(table)
}

/// Table name derived from an upload's file name: the part before the first
/// dot, without directories, normalized.
pub fn table_name_from_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem = base.split('.').next().unwrap_or(base);
    normalize_table_name(stem)
}

fn is_string_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(FileFormat::from_filename("a.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_filename("A.JSON").unwrap(), FileFormat::Json);
        assert!(matches!(
            FileFormat::from_filename("book.xlsx"),
            Err(SchemaError::UnsupportedInput { .. })
        ));
        assert!(matches!(
            FileFormat::from_filename("notes.txt"),
            Err(SchemaError::UnsupportedInput { .. })
        ));
    }

    #[test]
    fn test_table_name_from_filename() {
        assert_eq!(table_name_from_filename("Customers.csv"), "customers");
        assert_eq!(table_name_from_filename("exports/Order Items.v2.csv"), "order_items");
        assert_eq!(table_name_from_filename("C:\\data\\orders.json"), "orders");
    }

    #[test]
    fn test_decode_csv_normalizes_and_types() {
        let csv = b"Order ID,Customer ID,Select,Placed\n1,10,a,2024-01-01\n2,,b,2024-01-02\n";
        let table = decode("orders.csv", csv, true, &DecodeOptions::default()).unwrap();

        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["order_id", "customer_id", "select_col", "placed"]);
        assert_eq!(table.columns()[0].semantic_type, SemanticType::Integer);
        assert!(!table.columns()[0].nullable);
        assert!(table.columns()[1].nullable);
        assert!(table.columns()[2].column.was_reserved);
        assert_eq!(table.columns()[3].semantic_type, SemanticType::Datetime);
        assert_eq!(table.schema().field(2).name(), "select_col");
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_decode_without_headers() {
        let table = decode("raw.csv", b"1,x\n2,y\n", false, &DecodeOptions::default()).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["col_1", "col_2"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_decode_json_refines_string_dates() {
        let json = br#"[{"id": 1, "seen": "03/04/2024"}, {"id": 2, "seen": "12/31/2023"}]"#;
        let table = decode("visits.json", json, true, &DecodeOptions::default()).unwrap();
        assert_eq!(table.columns()[1].semantic_type, SemanticType::Datetime);
    }

    #[test]
    fn test_decode_rejects_empty_and_malformed() {
        let err = decode("empty.csv", b"  \n", true, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedInput { .. }));

        let err = decode("bad.json", b"{not json", true, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_preview_is_bounded() {
        let csv = b"n\n1\n2\n3\n4\n5\n6\n7\n";
        let table = decode("nums.csv", csv, true, &DecodeOptions::default()).unwrap();
        let preview = table.preview(5).unwrap();
        assert_eq!(preview.len(), 5);
        assert_eq!(preview[0]["n"], serde_json::json!(1));
        assert!(table.preview(0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_in_session_context() {
        let table = decode("people.csv", b"id,name\n1,a\n", true, &DecodeOptions::default())
            .unwrap();
        let ctx = SessionContext::new();
        table.register(&ctx, table.name()).unwrap();

        let batches = ctx
            .sql("SELECT COUNT(*) FROM \"people\"")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(batches[0].num_rows(), 1);
    }

    #[test]
    fn test_decode_options_validation() {
        assert!(DecodeOptions::default().validate().is_ok());
        assert!(DecodeOptions::default().with_delimiter('é').validate().is_err());
        assert!(DecodeOptions::default()
            .with_refine_threshold(1.5)
            .validate()
            .is_err());
    }
}
