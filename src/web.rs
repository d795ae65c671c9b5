//! Liveness HTTP surface: a single unauthenticated GET route whose static
//! JSON payload doubles as a "the process is up" probe.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub async fn start_web_server(port: u16) -> crate::error::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new().route("/", get(welcome_handler));

    info!("Starting liveness server on http://{}", addr);

    let listener = TcpListener::bind(&addr).await.map_err(anyhow::Error::from)?;
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;

    Ok(())
}

async fn welcome_handler() -> impl IntoResponse {
    let payload = serde_json::json!({
        "message": "Welcome to EduNotify Backend Server 👋",
        "description": "Your gateway to university timetables! 🎓🤖",
    });

    (StatusCode::OK, axum::Json(payload))
}
