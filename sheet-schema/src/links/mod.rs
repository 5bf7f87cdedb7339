//! Relationship suggestions between tables of one session.
//!
//! Suggestions are produced in three stages:
//!
//! 1. [`suggest_links_by_name`]: `*_id` columns of the new table are matched
//!    against the primary keys of the other tables by name.
//! 2. [`boost_links_by_type`]: matches whose endpoints share a semantic type
//!    gain confidence.
//! 3. [`validate_links_by_overlap`] (opt-in): matches whose sampled values are
//!    mostly present in the target column gain confidence.
//!
//! Confidence only ever goes up. Stages that cannot resolve an endpoint pass
//! the suggestion through untouched.
//!
//! # Example
//!
//! ```rust
//! use sheet_schema::config::LinkConfig;
//! use sheet_schema::links::LinkSuggester;
//! use sheet_schema::schema::{Column, Table};
//!
//! let customers = Table::new("customers", vec![Column::surrogate_key("id")]);
//!
//! let mut customer_id = Column::surrogate_key("customer_id");
//! customer_id.is_primary_key = false;
//! let orders = Table::new("orders", vec![Column::surrogate_key("id"), customer_id]);
//!
//! let suggester = LinkSuggester::new(LinkConfig::default());
//! let tables = vec![customers, orders.clone()];
//! let suggestions = suggester.suggest(&orders, &tables);
//!
//! assert_eq!(suggestions.len(), 1);
//! assert_eq!(suggestions[0].from, "orders.customer_id");
//! assert_eq!(suggestions[0].to, "customers.id");
//! assert!((suggestions[0].confidence - 0.7).abs() < 1e-9);
//! ```

mod naming;
mod overlap;
mod type_boost;

use std::fmt;
use std::str::FromStr;

use datafusion::prelude::SessionContext;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::LinkConfig;
use crate::error::{Result, SchemaError};
use crate::log_link_decision;
use crate::logging::LogConfig;
use crate::schema::Table;

pub use naming::suggest_links_by_name;
pub use overlap::validate_links_by_overlap;
pub use type_boost::boost_links_by_type;

/// A parsed `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl FromStr for ColumnRef {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((table, column))
                if !table.is_empty() && !column.is_empty() && !column.contains('.') =>
            {
                Ok(Self::new(table, column))
            }
            _ => Err(SchemaError::InvalidReference(format!(
                "expected 'table.column', got '{s}'"
            ))),
        }
    }
}

/// A proposed (or, once accepted, confirmed) relationship.
///
/// Endpoints are kept as the `table.column` strings they were created with;
/// lifecycle operations match on those strings exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSuggestion {
    pub from: String,
    pub to: String,
    pub confidence: f64,
}

impl LinkSuggestion {
    pub fn new(from: &ColumnRef, to: &ColumnRef, confidence: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            confidence,
        }
    }

    pub fn from_ref(&self) -> Result<ColumnRef> {
        self.from.parse()
    }

    pub fn to_ref(&self) -> Result<ColumnRef> {
        self.to.parse()
    }

    /// Exact endpoint match.
    pub fn is_pair(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }

    /// Adds `delta` to the confidence. With `clamp` the result is capped at
    /// 1.0 but never lowered below the current value.
    pub fn raise(&mut self, delta: f64, clamp: bool) {
        let raised = self.confidence + delta.max(0.0);
        self.confidence = if clamp {
            raised.min(1.0).max(self.confidence)
        } else {
            raised
        };
    }
}

/// Runs the suggestion stages in order.
#[derive(Debug, Clone, Default)]
pub struct LinkSuggester {
    config: LinkConfig,
    log_config: LogConfig,
}

impl LinkSuggester {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Name heuristic followed by the type boost.
    ///
    /// `tables` is the session's full table list; it may or may not contain
    /// `new_table` already.
    #[instrument(skip_all, fields(table = %new_table.name))]
    pub fn suggest(&self, new_table: &Table, tables: &[Table]) -> Vec<LinkSuggestion> {
        let suggestions = suggest_links_by_name(new_table, tables, &self.config);
        let suggestions = boost_links_by_type(suggestions, tables, &self.config);
        self.report(&suggestions);
        suggestions
    }

    /// [`suggest`](Self::suggest) plus overlap validation against the data
    /// registered in `ctx`.
    #[instrument(skip_all, fields(table = %new_table.name))]
    pub async fn suggest_with_overlap(
        &self,
        ctx: &SessionContext,
        new_table: &Table,
        tables: &[Table],
    ) -> Vec<LinkSuggestion> {
        let suggestions = suggest_links_by_name(new_table, tables, &self.config);
        let suggestions = boost_links_by_type(suggestions, tables, &self.config);
        let suggestions =
            validate_links_by_overlap(ctx, &new_table.name, suggestions, &self.config).await;
        self.report(&suggestions);
        suggestions
    }

    fn report(&self, suggestions: &[LinkSuggestion]) {
        for s in suggestions {
            log_link_decision!(
                self.log_config,
                from = %s.from,
                to = %s.to,
                confidence = s.confidence,
                "Suggested link"
            );
        }
        info!(count = suggestions.len(), "Link suggestion complete");
    }
}
