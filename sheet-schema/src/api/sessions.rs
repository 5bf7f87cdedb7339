use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{errors::schema_error, ApiResult, AppState};
use crate::service::{AcceptedLink, AddedLink, RejectedLink};
use crate::session::{Session, SessionSummary};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accept_link", post(accept_link))
        .route("/reject_link", post(reject_link))
        .route("/link", post(add_link))
        .route("/set_session_name/{session_id}", post(set_session_name))
        .route("/session/{session_id}", get(get_session))
        .route("/session/{session_id}/rename_table", post(rename_table))
        .route("/reset_session/{session_id}", delete(reset_session))
        .route("/reset_all_sessions", delete(reset_all_sessions))
        .route("/list_sessions", get(list_sessions))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LinkBody {
    session_id: String,
    from_field: String,
    to_field: String,
}

#[derive(Debug, Deserialize)]
struct SessionNameBody {
    schema_name: String,
}

#[derive(Debug, Deserialize)]
struct TableNameBody {
    table_name: String,
    new_name: String,
}

#[derive(Serialize)]
struct SessionNamed {
    session_id: String,
    schema_name: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct TableRenamed {
    session_id: String,
    old_name: String,
    new_name: String,
    message: String,
}

#[derive(Serialize)]
struct StatusMessage {
    status: String,
}

#[derive(Serialize)]
struct SessionList {
    sessions: Vec<SessionSummary>,
}

async fn accept_link(
    State(st): State<AppState>,
    Json(body): Json<LinkBody>,
) -> Result<(StatusCode, Json<AcceptedLink>), (StatusCode, String)> {
    st.service
        .accept_link(&body.session_id, &body.from_field, &body.to_field)
        .await
        .map(|accepted| (StatusCode::CREATED, Json(accepted)))
        .map_err(schema_error)
}

async fn reject_link(
    State(st): State<AppState>,
    Json(body): Json<LinkBody>,
) -> ApiResult<RejectedLink> {
    st.service
        .reject_link(&body.session_id, &body.from_field, &body.to_field)
        .await
        .map(Json)
        .map_err(schema_error)
}

async fn add_link(
    State(st): State<AppState>,
    Json(body): Json<LinkBody>,
) -> Result<(StatusCode, Json<AddedLink>), (StatusCode, String)> {
    st.service
        .add_link(&body.session_id, &body.from_field, &body.to_field)
        .await
        .map(|added| (StatusCode::CREATED, Json(added)))
        .map_err(schema_error)
}

async fn set_session_name(
    State(st): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<SessionNameBody>,
) -> ApiResult<SessionNamed> {
    let schema_name = st
        .service
        .set_session_name(&session_id, &body.schema_name)
        .await
        .map_err(schema_error)?;
    let message = match &schema_name {
        Some(name) => format!("Session {session_id} name set to {name}"),
        None => format!("Session {session_id} name cleared"),
    };
    Ok(Json(SessionNamed {
        session_id,
        schema_name,
        message,
    }))
}

async fn rename_table(
    State(st): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<TableNameBody>,
) -> ApiResult<TableRenamed> {
    let renamed = st
        .service
        .rename_table(&session_id, &body.table_name, &body.new_name)
        .await
        .map_err(schema_error)?;
    Ok(Json(TableRenamed {
        message: format!(
            "{}: Table {} renamed to {}",
            renamed.session_id, renamed.old_name, renamed.new_name
        ),
        session_id: renamed.session_id,
        old_name: renamed.old_name,
        new_name: renamed.new_name,
    }))
}

async fn get_session(
    State(st): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Session> {
    st.service
        .get_session(&session_id)
        .await
        .map(Json)
        .map_err(schema_error)
}

async fn reset_session(
    State(st): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusMessage> {
    st.service
        .reset_session(&session_id)
        .await
        .map_err(schema_error)?;
    Ok(Json(StatusMessage {
        status: format!("Session {session_id} reset successfully"),
    }))
}

async fn reset_all_sessions(State(st): State<AppState>) -> ApiResult<StatusMessage> {
    let count = st
        .service
        .reset_all_sessions()
        .await
        .map_err(schema_error)?;
    Ok(Json(StatusMessage {
        status: format!("All sessions reset successfully ({count} removed)"),
    }))
}

async fn list_sessions(State(st): State<AppState>) -> Json<SessionList> {
    Json(SessionList {
        sessions: st.service.list_sessions().await,
    })
}
