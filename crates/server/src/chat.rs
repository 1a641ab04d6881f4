use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use normbot_agent::{TurnOutcome, TurnRequest};
use serde_json::{json, Value};

use crate::api::{error_response, identifier_field, new_correlation_id, parse_body, ApiResponse, ApiState};

pub async fn chat(State(state): State<ApiState>, body: Bytes) -> ApiResponse {
    let correlation_id = new_correlation_id();
    let payload = parse_body(&body);

    let request = TurnRequest {
        external_id: identifier_field(&payload, &["telegramId", "telegram_id"]).unwrap_or_default(),
        message: message_field(&payload),
        history: payload.get("history").cloned().unwrap_or(Value::Null),
    };

    match state.chat_runtime.handle_turn_with_correlation(request, &correlation_id).await {
        Ok(outcome) => render_outcome(outcome),
        Err(error) => error_response(error.into_interface(correlation_id)),
    }
}

/// Chat clients may send numeric messages; those are answered as text.
fn message_field(payload: &Value) -> String {
    match payload.get("message") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

pub fn render_outcome(outcome: TurnOutcome) -> ApiResponse {
    match outcome {
        TurnOutcome::Blocked(reply) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "answer": reply.text,
                "messages_used": 0,
                "free_limit": reply.free_limit,
                "is_premium": false,
                "premium_until": null,
                "blocked": true,
            })),
        ),
        TurnOutcome::QuotaExceeded(reply) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "ok": false,
                "error": { "code": "LIMIT_REACHED", "message": "limit_reached" },
                "message": reply.message,
                "messages_used": reply.messages_used,
                "free_limit": reply.free_limit,
                "is_premium": false,
            })),
        ),
        TurnOutcome::Clarification(reply) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "answer": reply.text,
                "suggestions": reply.suggestions,
                "needs_clarification": true,
                "messages_used": reply.messages_used,
                "free_limit": reply.free_limit,
                "is_premium": reply.is_premium,
                "premium_until": reply.premium_until,
            })),
        ),
        TurnOutcome::Answered(reply) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "answer": reply.text,
                "suggestions": reply.suggestions,
                "messages_used": reply.messages_used,
                "free_limit": reply.free_limit,
                "is_premium": reply.is_premium,
                "premium_until": reply.premium_until,
            })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use normbot_agent::{BLOCKED_REPLY, STANDARDS_DISCLAIMER};
    use normbot_core::domain::account::{Account, AccountId};
    use normbot_db::repositories::AccountRepository;
    use serde_json::json;

    use crate::api::test_support::{answering, app, post_json, send, FixedProvider};

    #[tokio::test]
    async fn answered_turn_reports_usage_and_disclaimer() {
        let test_app = app(answering("Основная надпись по ГОСТ 2.104, форма 1."), None);
        let (status, body) = send(
            &test_app.router,
            post_json(
                "/api/chat",
                json!({"telegramId": 1001, "message": "Как заполнить основную надпись на чертеже детали?"}),
            ),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        assert_eq!(body["messages_used"], 1);
        assert_eq!(body["free_limit"], 3);
        assert_eq!(body["is_premium"], false);
        assert!(body["answer"].as_str().expect("answer").ends_with(STANDARDS_DISCLAIMER));
        assert!(body["suggestions"].is_null());
    }

    #[tokio::test]
    async fn profanity_is_refused_with_blocked_flag() {
        let test_app = app(answering("unused"), None);
        let (status, body) = send(
            &test_app.router,
            post_json("/api/chat", json!({"telegramId": "1002", "message": "бля, как оформить чертёж"})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["blocked"], true);
        assert_eq!(body["answer"], BLOCKED_REPLY);
        assert_eq!(body["messages_used"], 0);
        assert!(body["premium_until"].is_null());
    }

    #[tokio::test]
    async fn vague_greeting_gets_clarification() {
        let test_app = app(answering("unused"), None);
        let (status, body) = send(
            &test_app.router,
            post_json("/api/chat", json!({"telegramId": "1003", "message": "привет"})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["needs_clarification"], true);
        assert_eq!(body["messages_used"], 0);
        assert!(!body["suggestions"].as_array().expect("suggestions").is_empty());
    }

    #[tokio::test]
    async fn whitespace_message_gets_clarification_not_validation_error() {
        let test_app = app(answering("unused"), None);
        let (status, body) = send(
            &test_app.router,
            post_json("/api/chat", json!({"telegramId": "1008", "message": "   ", "history": []})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        assert_eq!(body["needs_clarification"], true);
        assert_eq!(body["messages_used"], 0);
    }

    #[tokio::test]
    async fn numeric_message_is_processed_as_text() {
        let test_app = app(answering("unused"), None);
        let (status, body) = send(
            &test_app.router,
            post_json("/api/chat", json!({"telegramId": "1009", "message": 12345})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["needs_clarification"], true);
    }

    #[tokio::test]
    async fn exhausted_quota_is_forbidden() {
        let test_app = app(answering("unused"), None);
        let now = Utc::now();
        let mut account = Account::new(AccountId("1004".to_string()), now);
        account.messages_used = 3;
        test_app.accounts.insert(account).await;

        let (status, body) = send(
            &test_app.router,
            post_json(
                "/api/chat",
                json!({"telegramId": "1004", "message": "Какие надписи обязательны на упаковке?"}),
            ),
        )
        .await;

        assert_eq!(status, 403);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "LIMIT_REACHED");
        assert_eq!(body["messages_used"], 3);
        assert_eq!(body["free_limit"], 3);
        assert!(body["message"].as_str().expect("message").contains('3'));
    }

    #[tokio::test]
    async fn missing_fields_and_malformed_json_are_validation_errors() {
        let test_app = app(answering("unused"), None);

        let (status, body) =
            send(&test_app.router, post_json("/api/chat", json!({"telegramId": "1005"}))).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "telegramId and message are required");

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{broken"))
            .expect("request");
        let (status, _) = send(&test_app.router, request).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn missing_credential_is_a_config_error() {
        let test_app =
            app(FixedProvider { reply: Ok("unused".to_string()), configured: false }, None);
        let (status, body) = send(
            &test_app.router,
            post_json("/api/chat", json!({"telegramId": "1006", "message": "Как оформить спецификацию?"})),
        )
        .await;

        assert_eq!(status, 500);
        assert_eq!(body["error"]["code"], "CONFIG_ERROR");
        assert!(body["correlation_id"].as_str().expect("correlation").starts_with("req-"));
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway_and_not_counted() {
        let test_app = app(
            FixedProvider { reply: Err((503, "overloaded".to_string())), configured: true },
            None,
        );
        let (status, body) = send(
            &test_app.router,
            post_json(
                "/api/chat",
                json!({"telegramId": "1007", "message": "Как указать шероховатость на чертеже вала?"}),
            ),
        )
        .await;

        assert_eq!(status, 502);
        assert_eq!(body["error"]["code"], "LLM_PROVIDER_ERROR");
        assert_eq!(body["error"]["details"], "overloaded");

        let account = test_app
            .accounts
            .find(&AccountId("1007".to_string()))
            .await
            .expect("lookup")
            .expect("account created before the model call");
        assert_eq!(account.messages_used, 0);
    }
}
