//! quizforge-edge: The HTTP edge of quizforge.
//!
//! Two endpoints, `POST /api/feedback` and `GET /api/health`, plus a 404
//! fallback. No quiz state is served over HTTP.

pub mod error;
pub mod handlers;
pub mod routes;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

pub use routes::create_router;

/// Bind `addr` and serve the edge router until Ctrl-C.
pub async fn serve(addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr()?;
    tracing::info!("edge listening on http://{local}");

    axum::serve(listener, create_router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("edge server failed")?;

    tracing::info!("edge server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
