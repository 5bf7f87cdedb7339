//! Working sessions: the tables uploaded so far, confirmed links, pending
//! suggestions, and the decoded data backing overlap checks.
//!
//! A suggestion is either pending (in `suggested_links`) or confirmed (in
//! `links`), never both. Every operation here either succeeds completely or
//! returns an error with the session untouched.

mod registry;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{Result, SchemaError};
use crate::links::{ColumnRef, LinkSuggestion};
use crate::schema::normalizer::normalize_table_name;
use crate::schema::Table;
use crate::sources::DecodedTable;

pub use registry::SessionRegistry;

/// Confidence recorded for links added by hand.
pub const MANUAL_LINK_CONFIDENCE: f64 = 1.0;

/// Counts reported by session listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub schema_name: Option<String>,
    pub table_count: usize,
    pub link_count: usize,
    pub suggested_link_count: usize,
    pub created_at: DateTime<Utc>,
}

/// One working session.
#[derive(Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub schema_name: Option<String>,
    pub tables: Vec<Table>,
    /// Confirmed links.
    pub links: Vec<LinkSuggestion>,
    /// Pending suggestions.
    pub suggested_links: Vec<LinkSuggestion>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    ctx: SessionContext,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("schema_name", &self.schema_name)
            .field("tables", &self.tables.len())
            .field("links", &self.links.len())
            .field("suggested_links", &self.suggested_links.len())
            .finish()
    }
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            schema_name: None,
            tables: Vec::new(),
            links: Vec::new(),
            suggested_links: Vec::new(),
            created_at: Utc::now(),
            ctx: SessionContext::new(),
        }
    }

    /// The DataFusion context holding every table's decoded data.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Appends an inferred table and registers its data.
    pub fn add_table(&mut self, table: Table, data: &DecodedTable) -> Result<()> {
        if self.has_table(&table.name) {
            return Err(SchemaError::TableAlreadyExists { table: table.name });
        }
        data.register(&self.ctx, &table.name)?;
        debug!(session = %self.session_id, table = %table.name, "Table added");
        self.tables.push(table);
        Ok(())
    }

    /// Appends new suggestions, skipping any `(from, to)` pair that is
    /// already pending or confirmed. Returns the suggestions actually added.
    pub fn merge_suggestions(&mut self, suggestions: Vec<LinkSuggestion>) -> Vec<LinkSuggestion> {
        let mut added = Vec::new();
        for suggestion in suggestions {
            let known = self
                .suggested_links
                .iter()
                .chain(&self.links)
                .any(|s| s.is_pair(&suggestion.from, &suggestion.to));
            if known {
                debug!(from = %suggestion.from, to = %suggestion.to, "Skipping known link");
                continue;
            }
            self.suggested_links.push(suggestion.clone());
            added.push(suggestion);
        }
        added
    }

    fn pending_index(&self, from: &str, to: &str) -> Result<usize> {
        self.suggested_links
            .iter()
            .position(|s| s.is_pair(from, to))
            .ok_or_else(|| SchemaError::suggestion_not_found(from, to))
    }

    /// Moves a pending suggestion to the confirmed links.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub fn accept_suggestion(&mut self, from: &str, to: &str) -> Result<LinkSuggestion> {
        let idx = self.pending_index(from, to)?;
        let link = self.suggested_links.remove(idx);
        self.links.push(link.clone());
        info!("Link accepted");
        Ok(link)
    }

    /// Discards a pending suggestion.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub fn reject_suggestion(&mut self, from: &str, to: &str) -> Result<LinkSuggestion> {
        let idx = self.pending_index(from, to)?;
        let link = self.suggested_links.remove(idx);
        info!("Link rejected");
        Ok(link)
    }

    /// Adds a confirmed link by hand. Both endpoints must exist. A matching
    /// pending suggestion is dropped; an identical confirmed link is returned
    /// as is.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub fn add_link(&mut self, from: &str, to: &str) -> Result<LinkSuggestion> {
        let from_ref: ColumnRef = from.parse()?;
        let to_ref: ColumnRef = to.parse()?;
        self.resolve(&from_ref)?;
        self.resolve(&to_ref)?;

        if let Some(existing) = self.links.iter().find(|l| l.is_pair(from, to)) {
            return Ok(existing.clone());
        }

        self.suggested_links.retain(|s| !s.is_pair(from, to));
        let link = LinkSuggestion::new(&from_ref, &to_ref, MANUAL_LINK_CONFIDENCE);
        self.links.push(link.clone());
        info!("Manual link added");
        Ok(link)
    }

    fn resolve(&self, reference: &ColumnRef) -> Result<()> {
        let table = self
            .table(&reference.table)
            .ok_or_else(|| SchemaError::table_not_found(&self.session_id, &reference.table))?;
        table
            .column(&reference.column)
            .map(|_| ())
            .ok_or_else(|| SchemaError::column_not_found(&reference.table, &reference.column))
    }

    /// Renames a table. The new name is normalized like a file stem; link
    /// endpoints and the registered data follow the rename. Returns the name
    /// actually used.
    #[instrument(skip(self), fields(session = %self.session_id))]
    pub fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<String> {
        let idx = self
            .tables
            .iter()
            .position(|t| t.name == old_name)
            .ok_or_else(|| SchemaError::table_not_found(&self.session_id, old_name))?;

        let new_name = normalize_table_name(new_name);
        if new_name == old_name {
            return Ok(new_name);
        }
        if self.has_table(&new_name) {
            return Err(SchemaError::TableAlreadyExists { table: new_name });
        }

        if let Some(provider) = self.ctx.deregister_table(TableReference::bare(old_name))? {
            if let Err(e) = self
                .ctx
                .register_table(TableReference::bare(new_name.as_str()), provider.clone())
            {
                self.ctx
                    .register_table(TableReference::bare(old_name), provider)?;
                return Err(e.into());
            }
        }

        self.tables[idx].name = new_name.clone();
        for link in self.links.iter_mut().chain(self.suggested_links.iter_mut()) {
            rewrite_table(&mut link.from, old_name, &new_name);
            rewrite_table(&mut link.to, old_name, &new_name);
        }

        info!(old_name, new_name = %new_name, "Table renamed");
        Ok(new_name)
    }

    /// Sets the display name; blank names clear it.
    pub fn set_schema_name(&mut self, name: &str) -> Option<&str> {
        let trimmed = name.trim();
        self.schema_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self.schema_name.as_deref()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            schema_name: self.schema_name.clone(),
            table_count: self.tables.len(),
            link_count: self.links.len(),
            suggested_link_count: self.suggested_links.len(),
            created_at: self.created_at,
        }
    }

    /// Base name for generated artifacts.
    pub fn artifact_stem(&self) -> &str {
        self.schema_name.as_deref().unwrap_or(&self.session_id)
    }

    pub(crate) fn shared(self) -> Arc<tokio::sync::Mutex<Session>> {
        Arc::new(tokio::sync::Mutex::new(self))
    }
}

fn rewrite_table(reference: &mut String, old_name: &str, new_name: &str) {
    if let Ok(parsed) = reference.parse::<ColumnRef>() {
        if parsed.table == old_name {
            *reference = ColumnRef::new(new_name, parsed.column).to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaInferencer;
    use crate::sources::{decode, DecodeOptions};

    fn upload(session: &mut Session, filename: &str, csv: &str) {
        let data = decode(filename, csv.as_bytes(), true, &DecodeOptions::default()).unwrap();
        let table = SchemaInferencer::default().infer(data.name(), data.columns());
        session.add_table(table, &data).unwrap();
    }

    fn session_with_suggestion() -> Session {
        let mut session = Session::new("s1");
        upload(&mut session, "customers.csv", "id,name\n1,a\n");
        upload(&mut session, "orders.csv", "order_id,customer_id\n1,1\n");
        session.merge_suggestions(vec![LinkSuggestion {
            from: "orders.customer_id".to_string(),
            to: "customers.id".to_string(),
            confidence: 0.7,
        }]);
        session
    }

    #[test]
    fn test_accept_moves_to_links() {
        let mut session = session_with_suggestion();
        let link = session
            .accept_suggestion("orders.customer_id", "customers.id")
            .unwrap();
        assert_eq!(link.confidence, 0.7);
        assert!(session.suggested_links.is_empty());
        assert_eq!(session.links, vec![link]);
    }

    #[test]
    fn test_accept_unknown_pair_leaves_state() {
        let mut session = session_with_suggestion();
        let before = (session.links.clone(), session.suggested_links.clone());

        let err = session
            .accept_suggestion("customers.id", "orders.customer_id")
            .unwrap_err();
        assert!(matches!(err, SchemaError::SuggestionNotFound { .. }));
        assert_eq!((session.links.clone(), session.suggested_links.clone()), before);

        let err = session.reject_suggestion("orders.nope", "customers.id").unwrap_err();
        assert!(matches!(err, SchemaError::SuggestionNotFound { .. }));
        assert_eq!((session.links, session.suggested_links), before);
    }

    #[test]
    fn test_reject_discards() {
        let mut session = session_with_suggestion();
        session
            .reject_suggestion("orders.customer_id", "customers.id")
            .unwrap();
        assert!(session.suggested_links.is_empty());
        assert!(session.links.is_empty());
    }

    #[test]
    fn test_merge_skips_pending_and_confirmed() {
        let mut session = session_with_suggestion();
        let dup = session.suggested_links[0].clone();
        assert!(session.merge_suggestions(vec![dup.clone()]).is_empty());

        session
            .accept_suggestion("orders.customer_id", "customers.id")
            .unwrap();
        assert!(session.merge_suggestions(vec![dup]).is_empty());
        assert!(session.suggested_links.is_empty());
    }

    #[test]
    fn test_add_link_validates_endpoints() {
        let mut session = session_with_suggestion();

        assert!(matches!(
            session.add_link("orders.customer_id", "ghosts.id"),
            Err(SchemaError::TableNotFound { .. })
        ));
        assert!(matches!(
            session.add_link("orders.nope", "customers.id"),
            Err(SchemaError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            session.add_link("orders", "customers.id"),
            Err(SchemaError::InvalidReference(_))
        ));

        let link = session.add_link("orders.customer_id", "customers.id").unwrap();
        assert_eq!(link.confidence, MANUAL_LINK_CONFIDENCE);
        assert!(session.suggested_links.is_empty());
        assert_eq!(session.links.len(), 1);

        session.add_link("orders.customer_id", "customers.id").unwrap();
        assert_eq!(session.links.len(), 1);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut session = Session::new("s1");
        upload(&mut session, "customers.csv", "id\n1\n");
        let data = decode("customers.csv", b"id\n2\n", true, &DecodeOptions::default()).unwrap();
        let table = SchemaInferencer::default().infer(data.name(), data.columns());
        assert!(matches!(
            session.add_table(table, &data),
            Err(SchemaError::TableAlreadyExists { .. })
        ));
        assert_eq!(session.tables.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_table_rewrites_links_and_data() {
        let mut session = session_with_suggestion();
        session.add_link("orders.customer_id", "customers.id").unwrap();

        let name = session.rename_table("customers", "Clients List").unwrap();
        assert_eq!(name, "clients_list");
        assert!(session.has_table("clients_list"));
        assert!(!session.has_table("customers"));
        assert_eq!(session.links[0].to, "clients_list.id");

        let batches = session
            .context()
            .sql("SELECT COUNT(*) FROM \"clients_list\"")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(batches[0].num_rows(), 1);
        assert!(session.context().sql("SELECT * FROM \"customers\"").await.is_err());
    }

    #[test]
    fn test_rename_table_errors() {
        let mut session = session_with_suggestion();
        assert!(matches!(
            session.rename_table("ghosts", "x"),
            Err(SchemaError::TableNotFound { .. })
        ));
        assert!(matches!(
            session.rename_table("customers", "Orders"),
            Err(SchemaError::TableAlreadyExists { .. })
        ));
        assert!(session.has_table("customers"));
    }

    #[test]
    fn test_schema_name_and_summary() {
        let mut session = session_with_suggestion();
        assert_eq!(session.artifact_stem(), "s1");
        assert_eq!(session.set_schema_name("  shop  "), Some("shop"));
        assert_eq!(session.artifact_stem(), "shop");
        assert_eq!(session.set_schema_name("   "), None);

        let summary = session.summary();
        assert_eq!(summary.table_count, 2);
        assert_eq!(summary.link_count, 0);
        assert_eq!(summary.suggested_link_count, 1);
    }

    #[test]
    fn test_serialization_skips_context() {
        let session = session_with_suggestion();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["tables"].as_array().unwrap().len(), 2);
        assert_eq!(json["suggested_links"][0]["to"], "customers.id");
        assert!(json.get("ctx").is_none());
    }
}
