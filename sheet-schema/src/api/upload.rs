use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{errors::schema_error, AppState};
use crate::schema::PrimaryKeyHint;
use crate::service::{UploadOptions, UploadOutcome};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct UploadQuery {
    session_id: Option<String>,
    has_headers: bool,
    with_row_count: bool,
    with_preview: bool,
    deep_check: bool,
    /// Use a surrogate `id` key instead of the first column.
    with_id: bool,
    /// Column to use as primary key.
    primary_key: Option<String>,
}

impl Default for UploadQuery {
    fn default() -> Self {
        Self {
            session_id: None,
            has_headers: true,
            with_row_count: false,
            with_preview: false,
            deep_check: false,
            with_id: false,
            primary_key: None,
        }
    }
}

impl UploadQuery {
    fn into_options(self) -> UploadOptions {
        let primary_key = match (self.with_id, self.primary_key) {
            (true, _) => PrimaryKeyHint::Surrogate,
            (false, Some(name)) if !name.trim().is_empty() => PrimaryKeyHint::Named(name),
            _ => PrimaryKeyHint::FirstColumn,
        };
        UploadOptions {
            session_id: self.session_id.filter(|s| !s.is_empty()),
            has_headers: self.has_headers,
            with_row_count: self.with_row_count,
            with_preview: self.with_preview,
            deep_check: self.deep_check,
            primary_key,
        }
    }
}

async fn upload(
    State(st): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadOutcome>), (StatusCode, String)> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        file = Some((filename, bytes));
    }

    let Some((filename, bytes)) = file else {
        return Err((
            StatusCode::BAD_REQUEST,
            "multipart field 'file' is required".to_string(),
        ));
    };

    let outcome = st
        .service
        .upload(&filename, &bytes, &query.into_options())
        .await
        .map_err(schema_error)?;

    let status = if outcome.first_table {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}
