use axum::http::StatusCode;
use tracing::{error, warn};

use crate::error::SchemaError;

/// Maps a service error to the status and message sent to the client.
pub fn schema_error(err: SchemaError) -> (StatusCode, String) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(err, SchemaError::TableAlreadyExists { .. }) {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    if status.is_server_error() {
        error!(error = ?err, "request failed");
    } else {
        warn!(error = %err, status = status.as_u16(), "request rejected");
    }

    (status, err.to_string())
}
