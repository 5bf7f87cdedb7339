//! HTTP surface over [`SchemaService`].
//!
//! Session routes live under `/api`, service metadata under `/core`, plus a
//! bare `/healthz`. Errors are returned as `(status, message)`.

mod errors;
mod generate;
mod info;
mod sessions;
mod upload;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::StatusCode, Json, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::service::SchemaService;

pub use errors::schema_error;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SchemaService>,
}

impl AppState {
    pub fn new(service: SchemaService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Full application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.service.config().max_upload_bytes;
    let cors = cors_layer(&state);
    let api = upload::router(state.clone())
        .merge(sessions::router(state.clone()))
        .merge(generate::router(state));

    Router::new()
        .nest("/api", api)
        .merge(info::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
}

/// Credentialed CORS for the configured origins. Methods and headers echo the
/// preflight request.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state
        .service
        .config()
        .origin_headers()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring allowed origins, cross-origin requests will be refused");
            Vec::new()
        });

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "sheet-schema-test-boundary";

    fn app() -> Router {
        router(AppState::new(SchemaService::new(ServiceConfig::default())))
    }

    fn multipart_request(uri: &str, filename: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap()
    }

    /// Uploads customers then orders; returns the session id.
    async fn seeded_session(app: &Router) -> String {
        let resp = app
            .clone()
            .oneshot(multipart_request(
                "/api/upload",
                "customers.csv",
                "id,name\n1,Ada\n2,Grace\n",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let session_id = body_json(resp).await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let resp = app
            .clone()
            .oneshot(multipart_request(
                &format!("/api/upload?session_id={session_id}&with_row_count=true"),
                "orders.csv",
                "order_id,customer_id\n10,1\n11,2\n",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let payload = body_json(resp).await;
        assert_eq!(payload["table_added"], json!("orders"));
        assert_eq!(payload["schema"]["row_count"], json!(2));
        assert_eq!(
            payload["suggested_links"][0]["from"],
            json!("orders.customer_id")
        );

        session_id
    }

    #[tokio::test]
    async fn test_health_and_core() {
        let app = app();

        let resp = app.clone().oneshot(empty_request(Method::GET, "/healthz")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "ok");

        let resp = app.clone().oneshot(empty_request(Method::GET, "/core/")).await.unwrap();
        assert_eq!(body_json(resp).await["message"], json!("sheet-schema API"));

        let resp = app.oneshot(empty_request(Method::GET, "/core/credits")).await.unwrap();
        assert_eq!(
            body_json(resp).await["version"],
            json!(env!("CARGO_PKG_VERSION"))
        );
    }

    fn preflight(uri: &str, origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(preflight("/api/upload", "http://localhost:3000"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");

        let resp = app
            .clone()
            .oneshot(preflight("/api/upload", "http://evil.example.com"))
            .await
            .unwrap();
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());

        let custom = router(AppState::new(SchemaService::new(
            ServiceConfig::default().with_allowed_origins(["https://app.example.com"]),
        )));
        let resp = custom
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/healthz")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(multipart_request("/api/upload", "notes.txt", "hello"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .clone()
            .oneshot(multipart_request(
                "/api/upload?session_id=missing",
                "a.csv",
                "id\n1\n",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .oneshot(empty_request(Method::GET, "/api/list_sessions"))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, json!({"sessions": []}));
    }

    #[tokio::test]
    async fn test_link_lifecycle_routes() {
        let app = app();
        let session_id = seeded_session(&app).await;

        let missing = json!({
            "session_id": session_id,
            "from_field": "customers.id",
            "to_field": "orders.customer_id",
        });
        let resp = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/accept_link", missing))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let link = json!({
            "session_id": session_id,
            "from_field": "orders.customer_id",
            "to_field": "customers.id",
        });
        let resp = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/accept_link", link.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let payload = body_json(resp).await;
        assert_eq!(payload["links"].as_array().unwrap().len(), 1);
        assert_eq!(payload["remaining_suggestions"], json!([]));

        let resp = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/reject_link", link))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(empty_request(
                Method::GET,
                &format!("/api/generate/{session_id}?format=sql"),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp)
            .await
            .contains("FOREIGN KEY (customer_id) REFERENCES customers(id)"));

        let resp = app
            .oneshot(empty_request(
                Method::GET,
                &format!("/api/generate/{session_id}?format=orm&as_json=true"),
            ))
            .await
            .unwrap();
        let payload = body_json(resp).await;
        assert_eq!(payload["format"], json!("orm"));
        assert_eq!(payload["filename"], json!(format!("{session_id}.py")));
    }

    #[tokio::test]
    async fn test_manual_link_and_renames() {
        let app = app();
        let session_id = seeded_session(&app).await;

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/link",
                json!({
                    "session_id": session_id,
                    "from_field": "orders.customer_id",
                    "to_field": "customers.name",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/set_session_name/{session_id}"),
                json!({"schema_name": " shop "}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["schema_name"], json!("shop"));

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/session/{session_id}/rename_table"),
                json!({"table_name": "customers", "new_name": "orders"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/session/{session_id}/rename_table"),
                json!({"table_name": "customers", "new_name": "Clients"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["new_name"], json!("clients"));

        let resp = app
            .clone()
            .oneshot(empty_request(
                Method::GET,
                &format!("/api/session/{session_id}"),
            ))
            .await
            .unwrap();
        let session = body_json(resp).await;
        assert_eq!(session["schema_name"], json!("shop"));
        assert_eq!(session["links"][0]["to"], json!("clients.name"));

        let resp = app
            .oneshot(empty_request(
                Method::GET,
                &format!("/api/download/{session_id}?format=sql"),
            ))
            .await
            .unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shop.sql\""
        );
    }

    #[tokio::test]
    async fn test_reset_routes() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(empty_request(Method::DELETE, "/api/reset_all_sessions"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let session_id = seeded_session(&app).await;

        let resp = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/list_sessions"))
            .await
            .unwrap();
        let payload = body_json(resp).await;
        assert_eq!(payload["sessions"][0]["table_count"], json!(2));
        assert_eq!(payload["sessions"][0]["suggested_link_count"], json!(1));

        let resp = app
            .clone()
            .oneshot(empty_request(
                Method::DELETE,
                &format!("/api/reset_session/{session_id}"),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(empty_request(
                Method::GET,
                &format!("/api/session/{session_id}"),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
