//! HTTP contract of the chat endpoint

use askerbot_adaptor_web::{build_router, AppState, WebConfig, WIDGET_CHAT_PATH};
use askerbot_core::{
    AskerError, CancellationToken, ChatConfig, CompletionProvider, CompletionRequest,
    CompletionResponse, Result,
};
use askerbot_plugin_knowledge::ChatService;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        Err(AskerError::provider("upstream returned status 500"))
    }
}

fn config(environment: &str) -> ChatConfig {
    ChatConfig {
        environment: environment.to_string(),
        index_dir: "/nonexistent/askerbot/index".into(),
        ..ChatConfig::default()
    }
}

fn router(service: ChatService) -> Router {
    let state = AppState::new(Arc::new(service), CancellationToken::new());
    build_router(state, &WebConfig::default())
}

fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_on_chat_is_rejected() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(Request::builder().uri("/chat").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["error"], "Method Not Allowed");
}

#[tokio::test]
async fn test_missing_message_is_bad_request() {
    let app = router(ChatService::new(config("production"), None));

    let response = app.clone().oneshot(post_json("/chat", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Message or messages is required"
    );

    let response = app
        .oneshot(post_json(
            "/chat",
            r#"{"messages": [{"role": "assistant", "content": "Hei!"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "No user message found in messages array"
    );
}

#[tokio::test]
async fn test_blank_message_is_bad_request() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(post_json("/chat", r#"{"message": "   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preflight() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri(WIDGET_CHAT_PATH)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_faq_over_widget_path() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(post_json(
            WIDGET_CHAT_PATH,
            r#"{"messages": [{"role": "user", "content": "Kontakt klubben"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache"
    );
    let body = json_body(response).await;
    assert_eq!(body["faqUsed"], true);
    assert_eq!(body["ragUsed"], false);
    assert!(body["reply"].as_str().unwrap().contains("post@askerfotball.no"));
    assert!(body.get("fallbackReason").is_none());
}

#[tokio::test]
async fn test_gibberish_gets_fallback_reason() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(post_json("/chat", r#"{"message": "asdkjasd qweoiqwe"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fallbackReason"], "no_relevant_sources");
    assert_eq!(body["sources"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_missing_key_hides_details_in_production() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(post_json("/chat", r#"{"message": "Hvor kan jeg parkere på Føyka?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Service configuration error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_missing_key_shows_details_in_development() {
    let app = router(ChatService::new(config("development"), None));
    let response = app
        .oneshot(post_json("/chat", r#"{"message": "Hvor kan jeg parkere på Føyka?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["details"].as_str().unwrap().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let provider: Arc<dyn CompletionProvider> = Arc::new(FailingProvider);
    let app = router(ChatService::new(config("production"), Some(provider)));
    let response = app
        .oneshot(post_json("/chat", r#"{"message": "Hvor kan jeg parkere på Føyka?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        "Kunne ikke få svar fra AI-assistenten. Prøv igjen senere."
    );
}

#[tokio::test]
async fn test_health_has_no_secrets() {
    let app = router(ChatService::new(config("production"), None));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["completionConfigured"], false);
    assert!(!body.to_string().contains("sk-"));
}
