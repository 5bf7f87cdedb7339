//! The operations exposed over HTTP, independent of the transport.
//!
//! [`SchemaService`] ties decoding, inference, link suggestion and the
//! session registry together. Decoding and inference run before any session
//! lock is taken; a new session only becomes visible once its first upload
//! has fully succeeded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::codegen::{self, Artifact, ArtifactFormat};
use crate::config::ServiceConfig;
use crate::error::{ErrorContext, Result, SchemaError};
use crate::links::{LinkSuggester, LinkSuggestion};
use crate::log_decode_op;
use crate::logging::{truncate_field, LogConfig};
use crate::schema::{InferenceOptions, PrimaryKeyHint, SchemaInferencer, Table};
use crate::session::{Session, SessionRegistry, SessionSummary};
use crate::sources::{self, DecodedTable};

/// Per-upload switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Add to this session instead of creating a new one
    pub session_id: Option<String>,
    /// First CSV row holds column names (default: true)
    pub has_headers: bool,
    pub with_row_count: bool,
    pub with_preview: bool,
    /// Run the overlap check on top of the name and type stages
    pub deep_check: bool,
    pub primary_key: PrimaryKeyHint,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            has_headers: true,
            with_row_count: false,
            with_preview: false,
            deep_check: false,
            primary_key: PrimaryKeyHint::FirstColumn,
        }
    }
}

impl UploadOptions {
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_row_count(mut self, enabled: bool) -> Self {
        self.with_row_count = enabled;
        self
    }

    pub fn with_preview(mut self, enabled: bool) -> Self {
        self.with_preview = enabled;
        self
    }

    pub fn with_deep_check(mut self, enabled: bool) -> Self {
        self.deep_check = enabled;
        self
    }

    pub fn with_primary_key(mut self, hint: PrimaryKeyHint) -> Self {
        self.primary_key = hint;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub session_id: String,
    pub table_added: String,
    pub schema: Table,
    /// Suggestions added to the session by this upload.
    pub suggested_links: Vec<LinkSuggestion>,
    /// The upload created the session.
    pub created_session: bool,
    /// The table is the first one in its session.
    #[serde(skip)]
    pub first_table: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedLink {
    pub session_id: String,
    pub accepted_link: LinkSuggestion,
    pub links: Vec<LinkSuggestion>,
    pub remaining_suggestions: Vec<LinkSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedLink {
    pub session_id: String,
    pub rejected_link: LinkSuggestion,
    pub remaining_suggestions: Vec<LinkSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedLink {
    pub session_id: String,
    pub link: LinkSuggestion,
    pub links: Vec<LinkSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenamedTable {
    pub session_id: String,
    pub old_name: String,
    pub new_name: String,
}

/// Session-scoped schema operations.
#[derive(Debug, Clone)]
pub struct SchemaService {
    config: ServiceConfig,
    registry: Arc<SessionRegistry>,
    suggester: LinkSuggester,
    log_config: LogConfig,
}

impl SchemaService {
    pub fn new(config: ServiceConfig) -> Self {
        let suggester = LinkSuggester::new(config.links.clone());
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            suggester,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.suggester = self.suggester.with_log_config(log_config.clone());
        self.log_config = log_config;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Decodes a file, infers its schema and adds it to a session.
    #[instrument(skip(self, bytes, options), fields(size = bytes.len(), session = ?options.session_id))]
    pub async fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> Result<UploadOutcome> {
        log_decode_op!(
            self.log_config,
            filename = %truncate_field(filename, self.log_config.max_field_length),
            "Decoding upload"
        );
        let data = sources::decode(filename, bytes, options.has_headers, &self.config.decode)?;
        let table = self.infer(&data, options)?;

        match &options.session_id {
            Some(id) => {
                let handle = self.registry.get(id).await?;
                self.add_to_existing(id, &handle, table, &data, options)
                    .await
            }
            None => {
                let mut session = SessionRegistry::new_session();
                let outcome = self
                    .add_to_session(&mut session, table, &data, options, true)
                    .await?;
                self.registry.insert(session).await;
                Ok(outcome)
            }
        }
    }

    /// Adds to a registered session. The session may be reset while this
    /// waits on its lock, so registration is checked again once held.
    async fn add_to_existing(
        &self,
        session_id: &str,
        handle: &Mutex<Session>,
        table: Table,
        data: &DecodedTable,
        options: &UploadOptions,
    ) -> Result<UploadOutcome> {
        let mut session = handle.lock().await;
        if !self.registry.contains(session_id).await {
            return Err(SchemaError::SessionNotFound(session_id.to_string()));
        }
        self.add_to_session(&mut session, table, data, options, false)
            .await
    }

    fn infer(&self, data: &DecodedTable, options: &UploadOptions) -> Result<Table> {
        let inferencer = SchemaInferencer::new(
            InferenceOptions::default().with_primary_key(options.primary_key.clone()),
        );
        let mut table = inferencer.infer(data.name(), data.columns());
        if options.with_row_count {
            table.row_count = Some(data.row_count());
        }
        if options.with_preview {
            table.row_preview = Some(
                data.preview(self.config.preview_rows)
                    .context("Failed to render row preview")?,
            );
        }
        Ok(table)
    }

    async fn add_to_session(
        &self,
        session: &mut Session,
        table: Table,
        data: &DecodedTable,
        options: &UploadOptions,
        created_session: bool,
    ) -> Result<UploadOutcome> {
        session.add_table(table.clone(), data)?;

        let suggestions = if options.deep_check {
            self.suggester
                .suggest_with_overlap(session.context(), &table, &session.tables)
                .await
        } else {
            self.suggester.suggest(&table, &session.tables)
        };
        let added = session.merge_suggestions(suggestions);

        info!(
            session = %session.session_id,
            table = %table.name,
            columns = table.columns.len(),
            suggestions = added.len(),
            "Table added"
        );

        Ok(UploadOutcome {
            session_id: session.session_id.clone(),
            table_added: table.name.clone(),
            first_table: session.tables.len() == 1,
            schema: table,
            suggested_links: added,
            created_session,
        })
    }

    pub async fn accept_link(&self, session_id: &str, from: &str, to: &str) -> Result<AcceptedLink> {
        let handle = self.registry.get(session_id).await?;
        let mut session = handle.lock().await;
        let accepted_link = session.accept_suggestion(from, to)?;
        Ok(AcceptedLink {
            session_id: session_id.to_string(),
            accepted_link,
            links: session.links.clone(),
            remaining_suggestions: session.suggested_links.clone(),
        })
    }

    pub async fn reject_link(&self, session_id: &str, from: &str, to: &str) -> Result<RejectedLink> {
        let handle = self.registry.get(session_id).await?;
        let mut session = handle.lock().await;
        let rejected_link = session.reject_suggestion(from, to)?;
        Ok(RejectedLink {
            session_id: session_id.to_string(),
            rejected_link,
            remaining_suggestions: session.suggested_links.clone(),
        })
    }

    pub async fn add_link(&self, session_id: &str, from: &str, to: &str) -> Result<AddedLink> {
        let handle = self.registry.get(session_id).await?;
        let mut session = handle.lock().await;
        let link = session.add_link(from, to)?;
        Ok(AddedLink {
            session_id: session_id.to_string(),
            link,
            links: session.links.clone(),
        })
    }

    pub async fn set_session_name(&self, session_id: &str, name: &str) -> Result<Option<String>> {
        let handle = self.registry.get(session_id).await?;
        let mut session = handle.lock().await;
        Ok(session.set_schema_name(name).map(str::to_string))
    }

    pub async fn rename_table(
        &self,
        session_id: &str,
        table_name: &str,
        new_name: &str,
    ) -> Result<RenamedTable> {
        let handle = self.registry.get(session_id).await?;
        let mut session = handle.lock().await;
        let new_name = session.rename_table(table_name, new_name)?;
        Ok(RenamedTable {
            session_id: session_id.to_string(),
            old_name: table_name.to_string(),
            new_name,
        })
    }

    /// A snapshot of the session.
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let handle = self.registry.get(session_id).await?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    pub async fn generate(&self, session_id: &str, format: ArtifactFormat) -> Result<Artifact> {
        let handle = self.registry.get(session_id).await?;
        let session = handle.lock().await;
        codegen::generate(&session, format)
    }

    pub async fn reset_session(&self, session_id: &str) -> Result<()> {
        self.registry.remove(session_id).await
    }

    pub async fn reset_all_sessions(&self) -> Result<usize> {
        self.registry.clear().await
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.registry.list().await
    }
}

impl Default for SchemaService {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}
