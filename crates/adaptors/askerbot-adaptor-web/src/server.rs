//! Router construction and serving

use crate::handlers::{chat_handler, health_check, method_not_allowed, preflight, AppState};
use askerbot_core::{AskerError, CancellationToken, Result};
use askerbot_plugin_knowledge::ChatService;
use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Widget path kept from the serverless deployment
pub const WIDGET_CHAT_PATH: &str = "/.netlify/functions/chat";

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Answer CORS preflights and add CORS headers
    pub enable_cors: bool,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            enable_cors: true,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Build the Axum router
pub fn build_router(state: AppState, config: &WebConfig) -> Router {
    let chat = post(chat_handler)
        .options(preflight)
        .fallback(method_not_allowed);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/chat", chat.clone())
        .route(WIDGET_CHAT_PATH, chat)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router
}

/// Serve until `shutdown` is cancelled
pub async fn serve(
    config: WebConfig,
    service: Arc<ChatService>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = build_router(AppState::new(service, shutdown.clone()), &config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AskerError::config(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Askerbot listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Askerbot stopped");
    Ok(())
}
