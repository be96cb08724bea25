//! HTTP front end of Prompt Iterator.
//!
//! Exposes `POST /api/chat`, which proxies a chat completion to an
//! OpenAI-compatible upstream and streams it back as line-framed wire
//! frames, and `GET /health`.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;

pub mod config;
pub mod error;
pub mod observability;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use observability::init_observability;
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(routes::chat::chat_handler))
        .route("/health", get(routes::health::health_handler))
        .with_state(state)
}

/// Binds `config.bind_addr()` and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr();
    let app = router(Arc::new(AppState::new(config)?));
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!("prompt iterator listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::warn!(error = %err, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
