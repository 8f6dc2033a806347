//! Request handlers.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct FeedbackReceipt {
    pub success: bool,
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    /// RFC 3339.
    pub timestamp: String,
}

/// `POST /api/feedback`: accept any JSON document and log it.
///
/// The body is parsed by hand so malformed JSON maps to our own 400 shape
/// instead of the extractor's rejection.
pub async fn submit_feedback(body: Bytes) -> Result<Json<FeedbackReceipt>, AppError> {
    let feedback: serde_json::Value = serde_json::from_slice(&body)?;
    let id = Uuid::new_v4();
    tracing::info!(%id, %feedback, "feedback received");
    Ok(Json(FeedbackReceipt {
        success: true,
        message: "Feedback received".to_string(),
        id,
    }))
}

/// `GET /api/health`.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Any unmatched route.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
