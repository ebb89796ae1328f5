//! Route handlers

use crate::error::ApiError;
use crate::types::ChatRequest;
use askerbot_core::CancellationToken;
use askerbot_plugin_knowledge::{ChatService, HealthReport};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// The chat pipeline
    pub service: Arc<ChatService>,
    /// Cancelled on shutdown; every request runs under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// State for a service and a shutdown token
    pub fn new(service: Arc<ChatService>, shutdown: CancellationToken) -> Self {
        Self { service, shutdown }
    }
}

/// POST /chat and the widget alias
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);

    async move {
        let Json(request) = match payload {
            Ok(body) => body,
            Err(rejection) => {
                return ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
                    .into_response();
            }
        };

        let question = match request.question() {
            Ok(q) => q,
            Err(missing) => return ApiError::bad_request(missing.as_str()).into_response(),
        };

        // Cancels the pipeline if the client goes away mid-request.
        let cancel = state.shutdown.child_token();
        let _guard = cancel.clone().drop_guard();

        let expose = state.service.config().expose_error_details();
        match state.service.answer(question, &cancel).await {
            Ok(reply) => {
                info!(
                    rag_used = reply.rag_used,
                    faq_used = reply.faq_used,
                    cached = reply.cached,
                    sources = reply.sources.len(),
                    "chat answered"
                );
                (
                    StatusCode::OK,
                    [(header::CACHE_CONTROL, "no-cache")],
                    Json(reply),
                )
                    .into_response()
            }
            Err(err) => ApiError::from_service(err, expose).into_response(),
        }
    }
    .instrument(span)
    .await
}

/// OPTIONS on the chat routes when no CORS layer answered it
pub async fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
        ],
    )
        .into_response()
}

/// Any other method on the chat routes
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health())
}
