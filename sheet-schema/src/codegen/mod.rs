//! Schema artifacts generated from a session's tables and confirmed links.

mod orm;
mod sql;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Result, SchemaError};
use crate::links::{ColumnRef, LinkSuggestion};
use crate::session::Session;

pub use orm::generate_orm;
pub use sql::generate_sql;

/// Output flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// `CREATE TABLE` statements
    #[default]
    Sql,
    /// SQLAlchemy declarative models
    Orm,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Sql => "sql",
            ArtifactFormat::Orm => "py",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Sql => "sql",
            ArtifactFormat::Orm => "orm",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(ArtifactFormat::Sql),
            "orm" => Ok(ArtifactFormat::Orm),
            other => Err(SchemaError::Configuration(format!(
                "unknown artifact format '{other}', expected 'sql' or 'orm'"
            ))),
        }
    }
}

/// Generated file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub format: ArtifactFormat,
    pub filename: String,
    /// Output lines, without trailing newlines.
    pub content: Vec<String>,
}

impl Artifact {
    pub fn text(&self) -> String {
        self.content.join("\n")
    }
}

/// Renders the session in the requested format.
#[instrument(skip(session), fields(session = %session.session_id))]
pub fn generate(session: &Session, format: ArtifactFormat) -> Result<Artifact> {
    let content = match format {
        ArtifactFormat::Sql => generate_sql(session)?,
        ArtifactFormat::Orm => generate_orm(session)?,
    };
    Ok(Artifact {
        format,
        filename: format!("{}.{}", session.artifact_stem(), format.extension()),
        content,
    })
}

/// Confirmed links leaving `table` whose endpoints both still exist,
/// as `(local column, referenced column)`.
fn outgoing_links<'a>(
    session: &'a Session,
    table: &str,
) -> impl Iterator<Item = (ColumnRef, ColumnRef)> + 'a {
    let table = table.to_string();
    session.links.iter().filter_map(move |link: &LinkSuggestion| {
        let from = link.from_ref().ok()?;
        let to = link.to_ref().ok()?;
        let resolves = |r: &ColumnRef| {
            session
                .table(&r.table)
                .and_then(|t| t.column(&r.column))
                .is_some()
        };
        (from.table == table && resolves(&from) && resolves(&to)).then_some((from, to))
    })
}
