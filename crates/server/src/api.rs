use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use normbot_agent::{AccountService, ChatRuntime};
use normbot_core::errors::InterfaceError;
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::error;

use crate::{account, chat};

pub type ApiResponse = (StatusCode, Json<Value>);

#[derive(Clone)]
pub struct ApiState {
    pub chat_runtime: Arc<ChatRuntime>,
    pub account_service: Arc<AccountService>,
    pub admin_token: Option<SecretString>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/user", get(account::user_status_query).post(account::user_status_body))
        .route("/api/activate-premium", post(account::activate_premium))
        .with_state(state)
}

pub fn new_correlation_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4())
}

/// Parses a request body leniently: empty or malformed JSON becomes `null`
/// so that field validation reports the problem uniformly.
pub fn parse_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Accepts string or numeric identifiers, the way chat clients send them.
pub fn identifier_field(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| payload.get(*key)).find_map(|value| match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

pub fn error_response(error: InterfaceError) -> ApiResponse {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut detail = json!({ "code": error.code(), "message": error.user_message() });
    match &error {
        InterfaceError::BadRequest { message, .. } => {
            detail["message"] = Value::String(message.clone());
        }
        InterfaceError::UpstreamUnavailable { detail: Some(details), .. } => {
            detail["details"] = Value::String(details.clone());
        }
        InterfaceError::Internal { message, .. } => {
            error!(
                event_name = "api.request.internal_error",
                correlation_id = error.correlation_id(),
                code = error.code(),
                error = %message,
                "request failed"
            );
        }
        InterfaceError::UpstreamUnavailable { .. } => {}
    }

    (
        status,
        Json(json!({
            "ok": false,
            "error": detail,
            "correlation_id": error.correlation_id(),
        })),
    )
}
