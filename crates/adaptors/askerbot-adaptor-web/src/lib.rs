//! HTTP front for Askerbot
//!
//! Routes:
//! - `POST /chat` and `POST /.netlify/functions/chat`: answer a question
//! - `OPTIONS` on both chat paths: CORS preflight
//! - `GET /health`: status without secrets
//!
//! Any other method on the chat paths gets `405 {"error": "Method Not Allowed"}`.

pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use handlers::AppState;
pub use server::{build_router, serve, WebConfig, WIDGET_CHAT_PATH};
pub use types::{ChatRequest, ChatTurn};
