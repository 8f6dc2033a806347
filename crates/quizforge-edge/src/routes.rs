//! Router assembly.

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Build the edge router: feedback, health and a plain-text 404 for
/// everything else.
pub fn create_router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/feedback", post(handlers::submit_feedback))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
