//! JSON decoding: an array of records, a single record, or one record per
//! line.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use tracing::debug;

use super::DecodeOptions;
use crate::error::{Result, SchemaError};

const JSON_BATCH_SIZE: usize = 1024;

pub(crate) fn read_json(
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let rows = parse_records(bytes)?;

    let inference_rows = rows.iter().take(options.schema_infer_max_records.max(1));
    let schema = Arc::new(infer_json_schema_from_iterator(
        inference_rows.map(Ok::<_, arrow::error::ArrowError>),
    )?);
    debug!(
        fields = schema.fields().len(),
        records = rows.len(),
        "Inferred JSON schema"
    );

    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(JSON_BATCH_SIZE)
        .build_decoder()?;
    let mut batches = Vec::with_capacity(rows.len() / JSON_BATCH_SIZE + 1);
    for chunk in rows.chunks(JSON_BATCH_SIZE) {
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            batches.push(batch);
        }
    }

    Ok((schema, batches))
}

fn parse_records(bytes: &[u8]) -> Result<Vec<Value>> {
    let rows = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(items)) => items,
        Ok(record @ Value::Object(_)) => vec![record],
        Ok(other) => {
            return Err(SchemaError::Serialization(format!(
                "expected an array of records, found {}",
                json_kind(&other)
            )))
        }
        // Not a single document: try newline-delimited records.
        Err(_) => bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(serde_json::from_slice::<Value>)
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    if let Some(bad) = rows.iter().find(|row| !row.is_object()) {
        return Err(SchemaError::Serialization(format!(
            "every record must be an object, found {}",
            json_kind(bad)
        )));
    }

    Ok(rows)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
