//! Value-overlap validation over the session's registered tables.
//!
//! For each suggestion leaving the newly added table, up to `sample_size`
//! distinct non-null source values are drawn and looked up in the distinct
//! non-null values of the target column with a LEFT JOIN. The suggestion is
//! boosted when the match rate is strictly above `overlap_threshold`.

use arrow::array::{Array, Int64Array};
use arrow::datatypes::DataType;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use tracing::{debug, instrument, warn};

use super::{ColumnRef, LinkSuggestion};
use crate::config::LinkConfig;
use crate::error::{Result, SchemaError};
use crate::security::SqlSecurity;

/// Sampled and matched value counts for one suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overlap {
    sampled: i64,
    matched: i64,
}

impl Overlap {
    fn match_rate(&self) -> Option<f64> {
        (self.sampled > 0).then(|| self.matched as f64 / self.sampled as f64)
    }
}

/// Boosts suggestions whose source values are mostly present in the target.
///
/// Suggestions not leaving `new_table` are returned unchanged, as are those
/// whose tables or columns are not registered in `ctx`. Query failures and
/// timeouts are logged and leave the suggestion unchanged.
#[instrument(skip(ctx, suggestions, config), fields(suggestions = suggestions.len()))]
pub async fn validate_links_by_overlap(
    ctx: &SessionContext,
    new_table: &str,
    mut suggestions: Vec<LinkSuggestion>,
    config: &LinkConfig,
) -> Vec<LinkSuggestion> {
    for suggestion in &mut suggestions {
        let (Ok(from), Ok(to)) = (suggestion.from_ref(), suggestion.to_ref()) else {
            continue;
        };
        if from.table != new_table {
            continue;
        }

        let check = tokio::time::timeout(
            config.overlap_timeout(),
            measure_overlap(ctx, &from, &to, config.sample_size),
        )
        .await;

        match check {
            Ok(Ok(Some(overlap))) => {
                let rate = overlap.match_rate();
                if rate.is_some_and(|r| r > config.overlap_threshold) {
                    suggestion.raise(config.overlap_boost, config.clamp_confidence);
                }
                debug!(
                    %from,
                    %to,
                    sampled = overlap.sampled,
                    matched = overlap.matched,
                    confidence = suggestion.confidence,
                    "Overlap check"
                );
            }
            Ok(Ok(None)) => {
                debug!(%from, %to, "Endpoint data not registered, passing through");
            }
            Ok(Err(e)) => {
                warn!(%from, %to, error = %e, "Overlap check failed, passing through");
            }
            Err(_) => {
                warn!(
                    %from,
                    %to,
                    timeout_ms = config.overlap_timeout_ms,
                    "Overlap check timed out, passing through"
                );
            }
        }
    }
    suggestions
}

/// `None` when either endpoint is missing from the context.
async fn measure_overlap(
    ctx: &SessionContext,
    from: &ColumnRef,
    to: &ColumnRef,
    sample_size: usize,
) -> Result<Option<Overlap>> {
    let (Some(from_type), Some(to_type)) = (
        column_type(ctx, from).await,
        column_type(ctx, to).await,
    ) else {
        return Ok(None);
    };

    let cast = if from_type.is_numeric() && to_type.is_numeric() {
        "DOUBLE"
    } else {
        "VARCHAR"
    };
    let sql = overlap_query(from, to, cast, sample_size)?;
    debug!("Generated overlap query: {}", sql);

    let batches = ctx.sql(&sql).await?.collect().await?;
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(Some(Overlap {
            sampled: 0,
            matched: 0,
        }));
    };

    let count = |idx: usize, label: &str| -> Result<i64> {
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<Int64Array>()
            .filter(|a| !a.is_null(0))
            .map(|a| a.value(0))
            .ok_or_else(|| SchemaError::Internal(format!("Invalid {label} count column type")))
    };

    Ok(Some(Overlap {
        sampled: count(0, "sampled")?,
        matched: count(1, "matched")?,
    }))
}

async fn column_type(ctx: &SessionContext, reference: &ColumnRef) -> Option<DataType> {
    let provider = ctx
        .table_provider(TableReference::bare(reference.table.as_str()))
        .await
        .ok()?;
    let schema = provider.schema();
    schema
        .field_with_name(&reference.column)
        .ok()
        .map(|f| f.data_type().clone())
}

fn overlap_query(
    from: &ColumnRef,
    to: &ColumnRef,
    cast: &str,
    sample_size: usize,
) -> Result<String> {
    let from_table = SqlSecurity::escape_identifier(&from.table)?;
    let from_col = SqlSecurity::escape_identifier(&from.column)?;
    let to_table = SqlSecurity::escape_identifier(&to.table)?;
    let to_col = SqlSecurity::escape_identifier(&to.column)?;

    Ok(format!(
        "WITH sampled AS (
            SELECT v FROM (
                SELECT DISTINCT CAST({from_col} AS {cast}) AS v
                FROM {from_table}
                WHERE {from_col} IS NOT NULL
            ) src
            ORDER BY random()
            LIMIT {sample_size}
         ),
         target AS (
            SELECT DISTINCT CAST({to_col} AS {cast}) AS v
            FROM {to_table}
            WHERE {to_col} IS NOT NULL
         )
         SELECT
            COUNT(*) AS sampled,
            COUNT(target.v) AS matched
         FROM sampled
         LEFT JOIN target ON sampled.v = target.v"
    ))
}
