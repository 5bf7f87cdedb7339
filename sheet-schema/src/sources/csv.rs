//! CSV decoding with Arrow schema inference.

use std::io::Cursor;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use super::DecodeOptions;
use crate::error::Result;

/// Reads CSV bytes into record batches. Column names are whatever the file
/// provides (or `column_N` without a header row); callers rename them.
pub(crate) fn read_csv(
    bytes: &[u8],
    has_headers: bool,
    options: &DecodeOptions,
) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let format = Format::default()
        .with_header(has_headers)
        .with_delimiter(options.delimiter_byte()?);

    let (schema, inferred_from) =
        format.infer_schema(Cursor::new(bytes), Some(options.schema_infer_max_records))?;
    let schema = Arc::new(schema);
    debug!(
        fields = schema.fields().len(),
        records = inferred_from,
        "Inferred CSV schema"
    );

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(Cursor::new(bytes))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((schema, batches))
}
