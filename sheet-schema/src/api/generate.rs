use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{errors::schema_error, AppState};
use crate::codegen::ArtifactFormat;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate/{session_id}", get(generate))
        .route("/download/{session_id}", get(download))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateQuery {
    format: ArtifactFormat,
    /// Wrap the output in `{format, filename, content}`.
    as_json: bool,
}

async fn generate(
    State(st): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> Result<Response, (StatusCode, String)> {
    let artifact = st
        .service
        .generate(&session_id, query.format)
        .await
        .map_err(schema_error)?;

    if query.as_json {
        Ok(Json(artifact).into_response())
    } else {
        Ok(artifact.text().into_response())
    }
}

async fn download(
    State(st): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> Result<Response, (StatusCode, String)> {
    let artifact = st
        .service
        .generate(&session_id, query.format)
        .await
        .map_err(schema_error)?;

    let filename = artifact
        .filename
        .replace(|c: char| c == '"' || c == '\\' || c.is_control(), "_");
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.text(),
    )
        .into_response())
}
