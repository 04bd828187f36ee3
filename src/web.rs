use axum::{routing::get, Router};
use std::net::SocketAddr;

pub const ALIVE_TEXT: &str = "✅ Telegram Bot is running!";

/// Для health-check хостинга: один GET / с фиксированным текстом.
pub fn router() -> Router {
    Router::new().route("/", get(|| async { ALIVE_TEXT }))
}

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "liveness endpoint listening");
    axum::serve(listener, router()).await?;
    Ok(())
}
