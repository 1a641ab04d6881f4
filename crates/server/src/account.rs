use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use normbot_agent::AccountStatus;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::{error_response, identifier_field, new_correlation_id, parse_body, ApiResponse, ApiState};

pub const ADMIN_TOKEN_HEADER: &str = "x-normbot-admin-token";

const ID_KEYS: [&str; 2] = ["telegramId", "telegram_id"];

pub async fn user_status_query(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let payload = Value::Object(
        params.into_iter().map(|(key, value)| (key, Value::String(value))).collect(),
    );
    user_status(&state, &payload).await
}

pub async fn user_status_body(State(state): State<ApiState>, body: Bytes) -> ApiResponse {
    user_status(&state, &parse_body(&body)).await
}

async fn user_status(state: &ApiState, payload: &Value) -> ApiResponse {
    let correlation_id = new_correlation_id();
    let external_id = identifier_field(payload, &ID_KEYS).unwrap_or_default();

    match state.account_service.status(&external_id).await {
        Ok(status) => (StatusCode::OK, Json(render_status(&status))),
        Err(error) => error_response(error.into_interface(correlation_id)),
    }
}

fn render_status(status: &AccountStatus) -> Value {
    json!({
        "ok": true,
        "messages_used": status.messages_used,
        "free_limit": status.free_limit,
        "is_premium": status.is_premium,
        "premium_until": status.premium_until,
    })
}

pub async fn activate_premium(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    let correlation_id = new_correlation_id();

    if let Some(expected) = &state.admin_token {
        let presented = headers.get(ADMIN_TOKEN_HEADER).and_then(|value| value.to_str().ok());
        if presented != Some(expected.expose_secret()) {
            warn!(
                event_name = "api.premium.unauthorized",
                correlation_id = %correlation_id,
                "premium activation refused: admin token mismatch"
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "ok": false,
                    "error": { "code": "UNAUTHORIZED", "message": "admin token required" },
                    "correlation_id": correlation_id,
                })),
            );
        }
    }

    let payload = parse_body(&body);
    let external_id = identifier_field(&payload, &ID_KEYS).unwrap_or_default();
    let payment_ref = identifier_field(&payload, &["paymentId", "payment_id"]);

    match state.account_service.activate_premium(&external_id, payment_ref.as_deref()).await {
        Ok(grant) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "is_premium": grant.is_premium,
                "premium_until": grant.premium_until,
            })),
        ),
        Err(error) => error_response(error.into_interface(correlation_id)),
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use chrono::{DateTime, Duration, Utc};
    use normbot_core::domain::account::{Account, AccountId};
    use normbot_db::repositories::AccountRepository;
    use serde_json::json;

    use super::ADMIN_TOKEN_HEADER;
    use crate::api::test_support::{answering, app, post_json, send};

    fn parse_time(value: &serde_json::Value) -> DateTime<Utc> {
        value.as_str().expect("timestamp").parse().expect("rfc3339")
    }

    #[tokio::test]
    async fn user_status_accepts_query_and_body_identifiers() {
        let test_app = app(answering("unused"), None);

        let request = Request::builder()
            .uri("/api/user?telegram_id=2001")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&test_app.router, request).await;
        assert_eq!(status, 200);
        assert_eq!(body["messages_used"], 0);
        assert_eq!(body["free_limit"], 3);
        assert_eq!(body["is_premium"], false);
        assert!(body["premium_until"].is_null());

        let (status, body) =
            send(&test_app.router, post_json("/api/user", json!({"telegramId": 2001}))).await;
        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn user_status_without_identifier_is_rejected() {
        let test_app = app(answering("unused"), None);
        let request = Request::builder().uri("/api/user").body(Body::empty()).expect("request");
        let (status, body) = send(&test_app.router, request).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["message"], "telegramId is required");
    }

    #[tokio::test]
    async fn expired_window_is_reported_as_not_premium() {
        let test_app = app(answering("unused"), None);
        let now = Utc::now();
        let mut account = Account::new(AccountId("2002".to_string()), now - Duration::days(40));
        account.is_premium = true;
        account.premium_until = Some(now - Duration::hours(1));
        test_app.accounts.insert(account).await;

        let (status, body) =
            send(&test_app.router, post_json("/api/user", json!({"telegramId": "2002"}))).await;
        assert_eq!(status, 200);
        assert_eq!(body["is_premium"], false);
    }

    #[tokio::test]
    async fn activation_grants_a_period_and_records_payment() {
        let test_app = app(answering("unused"), None);
        let before = Utc::now();

        let (status, body) = send(
            &test_app.router,
            post_json("/api/activate-premium", json!({"telegramId": "2003", "paymentId": "pay-77"})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["is_premium"], true);
        let until = parse_time(&body["premium_until"]);
        assert!(until >= before + Duration::days(30));
        assert!(until <= Utc::now() + Duration::days(30));

        let stored = test_app
            .accounts
            .find(&AccountId("2003".to_string()))
            .await
            .expect("lookup")
            .expect("account");
        assert_eq!(stored.last_payment_id.as_deref(), Some("pay-77"));
    }

    #[tokio::test]
    async fn activation_requires_matching_admin_token_when_configured() {
        let test_app = app(answering("unused"), Some("s3cret"));

        let (status, body) = send(
            &test_app.router,
            post_json("/api/activate-premium", json!({"telegramId": "2004"})),
        )
        .await;
        assert_eq!(status, 401);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let request = Request::builder()
            .method("POST")
            .uri("/api/activate-premium")
            .header("content-type", "application/json")
            .header(ADMIN_TOKEN_HEADER, "s3cret")
            .body(Body::from(json!({"telegramId": "2004"}).to_string()))
            .expect("request");
        let (status, body) = send(&test_app.router, request).await;
        assert_eq!(status, 200);
        assert_eq!(body["is_premium"], true);
    }
}
