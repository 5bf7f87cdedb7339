//! Prelude for commonly used types in sheet-schema.

pub use crate::codegen::{Artifact, ArtifactFormat};
pub use crate::config::{LinkConfig, ServiceConfig};
pub use crate::error::{ErrorContext, Result, SchemaError};
pub use crate::links::{ColumnRef, LinkSuggester, LinkSuggestion};
pub use crate::logging::LogConfig;
pub use crate::schema::{
    Column, ColumnNormalizer, PrimaryKeyHint, SchemaInferencer, SemanticType, Table,
};
pub use crate::service::{SchemaService, UploadOptions};
pub use crate::session::{Session, SessionRegistry};
pub use crate::sources::{DecodeOptions, DecodedTable};
