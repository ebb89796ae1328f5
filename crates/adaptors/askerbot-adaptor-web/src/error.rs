//! Mapping of pipeline errors to HTTP responses
//!
//! Bodies are always `{"error": "..."}` with a polite message. Internal
//! detail is added as `details` only outside production, and is scrubbed.

use askerbot_core::{utils::scrub_message, AskerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

const UPSTREAM_MESSAGE: &str = "Kunne ikke få svar fra AI-assistenten. Prøv igjen senere.";
const EMPTY_MESSAGE: &str = "Uventet svar fra AI-assistenten";
const TIMEOUT_MESSAGE: &str = "Svaret tok for lang tid. Prøv igjen senere.";
const CONFIG_MESSAGE: &str = "Service configuration error";
const INTERNAL_MESSAGE: &str = "En feil oppstod. Prøv igjen senere.";
const CANCELLED_MESSAGE: &str = "Forespørselen ble avbrutt.";

/// Error response for the HTTP API
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl ApiError {
    /// 400 with a caller-facing message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    /// 405 for anything but POST and OPTIONS on the chat routes
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method Not Allowed".to_string(),
            details: None,
        }
    }

    /// Translate a pipeline error
    pub fn from_service(err: AskerError, expose_details: bool) -> Self {
        let (status, message) = match &err {
            AskerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AskerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, CONFIG_MESSAGE.to_string()),
            AskerError::EmptyCompletion => (StatusCode::BAD_GATEWAY, EMPTY_MESSAGE.to_string()),
            AskerError::Provider(_) | AskerError::Network(_) => {
                (StatusCode::BAD_GATEWAY, UPSTREAM_MESSAGE.to_string())
            }
            AskerError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, TIMEOUT_MESSAGE.to_string()),
            AskerError::Cancelled(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, CANCELLED_MESSAGE.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string()),
        };

        let scrubbed = scrub_message(&err.to_string());
        if status.is_server_error() {
            error!(status = status.as_u16(), "request failed: {}", scrubbed);
        } else {
            warn!(status = status.as_u16(), "request rejected: {}", scrubbed);
        }

        Self {
            status,
            message,
            details: expose_details.then_some(scrubbed),
        }
    }

    /// HTTP status
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AskerError::validation("Message is empty"), StatusCode::BAD_REQUEST),
            (AskerError::config("no key"), StatusCode::INTERNAL_SERVER_ERROR),
            (AskerError::provider("status 500"), StatusCode::BAD_GATEWAY),
            (AskerError::EmptyCompletion, StatusCode::BAD_GATEWAY),
            (AskerError::timeout("answer"), StatusCode::GATEWAY_TIMEOUT),
            (AskerError::cancelled("answer"), StatusCode::SERVICE_UNAVAILABLE),
            (AskerError::other("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_service(err, false).status(), status);
        }
    }

    #[test]
    fn test_details_only_when_exposed() {
        let hidden = ApiError::from_service(AskerError::config("OPENAI_API_KEY missing"), false);
        assert!(hidden.details.is_none());
        assert_eq!(hidden.message, CONFIG_MESSAGE);

        let shown = ApiError::from_service(AskerError::provider("api_key=abcdefghijklmnop"), true);
        let details = shown.details.unwrap();
        assert!(details.contains("REDACTED"));
        assert!(!details.contains("abcdefghijklmnop"));
    }
}
