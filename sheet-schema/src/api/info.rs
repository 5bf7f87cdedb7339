use axum::{routing::get, Json, Router};
use serde::Serialize;

pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/core/", get(root))
        .route("/core/credits", get(credits))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct RootMessage {
    message: &'static str,
}

async fn root() -> Json<RootMessage> {
    Json(RootMessage {
        message: "sheet-schema API",
    })
}

#[derive(Serialize)]
struct Credits {
    name: &'static str,
    version: &'static str,
    authors: &'static str,
    license: &'static str,
}

async fn credits() -> Json<Credits> {
    Json(Credits {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        authors: env!("CARGO_PKG_AUTHORS"),
        license: env!("CARGO_PKG_LICENSE"),
    })
}
