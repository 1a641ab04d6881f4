use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use normbot_core::config::AppConfig;
use normbot_core::domain::account::AccountId;
use normbot_core::entitlement::EntitlementDecision;
use normbot_core::errors::ApplicationError;
use normbot_core::policy::{DomainTag, ModerationCategory, PolicyError, PolicyTables};
use normbot_db::repositories::AccountRepository;

use crate::account::persistence;
use crate::conversation::{MemoryLimits, MemoryWindow};
use crate::guardrails::{GateDecision, TurnGate};
use crate::llm::{CompletionProvider, CompletionRequest, GenerationParams};
use crate::prompt::PromptComposer;
use crate::response::ResponsePostProcessor;

pub const BLOCKED_REPLY: &str = "Я не могу помогать с матом или 18+ контентом.\nПереформулируйте запрос нейтрально — и я помогу по сути.";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnRequest {
    pub external_id: String,
    pub message: String,
    /// Untrusted caller-supplied history; sanitized before use.
    pub history: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockedReply {
    pub category: ModerationCategory,
    pub text: String,
    pub free_limit: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuotaReply {
    pub message: String,
    pub messages_used: u32,
    pub free_limit: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClarificationReply {
    pub domain: DomainTag,
    pub text: String,
    pub suggestions: Vec<String>,
    pub messages_used: u32,
    pub free_limit: u32,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnsweredReply {
    pub domain: DomainTag,
    pub text: String,
    pub suggestions: Option<Vec<String>>,
    pub messages_used: u32,
    pub free_limit: u32,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    Blocked(BlockedReply),
    QuotaExceeded(QuotaReply),
    Clarification(ClarificationReply),
    Answered(AnsweredReply),
}

impl TurnOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blocked(_) => "blocked",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Clarification(_) => "clarification",
            Self::Answered(_) => "answered",
        }
    }
}

fn quota_message(free_limit: u32) -> String {
    format!(
        "Ваши {free_limit} бесплатных обращения закончились. Оформите премиум, чтобы пользоваться без ограничений."
    )
}

fn policy_failure(error: PolicyError) -> ApplicationError {
    ApplicationError::Configuration(error.to_string())
}

/// Drives one chat turn through the gates, the model call, and usage accounting.
pub struct ChatRuntime {
    accounts: Arc<dyn AccountRepository>,
    provider: Arc<dyn CompletionProvider>,
    gate: TurnGate,
    composer: PromptComposer,
    post_processor: ResponsePostProcessor,
    memory_limits: MemoryLimits,
    params: GenerationParams,
    clock: Arc<dyn Clock>,
}

impl ChatRuntime {
    pub fn new(
        config: &AppConfig,
        tables: &PolicyTables,
        accounts: Arc<dyn AccountRepository>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            accounts,
            provider,
            gate: TurnGate::new(tables, &config.gate)?,
            composer: PromptComposer::default(),
            post_processor: ResponsePostProcessor::from_tables(tables),
            memory_limits: MemoryLimits::from(&config.gate),
            params: GenerationParams::from(&config.llm),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn free_limit(&self) -> u32 {
        self.gate.entitlement().free_limit()
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, ApplicationError> {
        let correlation_id = format!("req-{}", uuid::Uuid::new_v4());
        self.handle_turn_with_correlation(request, &correlation_id).await
    }

    pub async fn handle_turn_with_correlation(
        &self,
        request: TurnRequest,
        correlation_id: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        if !self.provider.is_configured() {
            warn!(
                event_name = "chat.turn.config_missing",
                correlation_id,
                provider = self.provider.name(),
                "completion provider has no credential"
            );
            return Err(ApplicationError::Configuration(format!(
                "{} credential is not set",
                self.provider.name()
            )));
        }

        // A whitespace-only message is a vague turn, not a missing one.
        let external_id = request.external_id.trim();
        if external_id.is_empty() || request.message.is_empty() {
            return Err(ApplicationError::Validation(
                "telegramId and message are required".to_string(),
            ));
        }
        let text = request.message.trim();
        let id = AccountId(external_id.to_string());
        let free_limit = self.free_limit();

        if let GateDecision::Blocked(category) = self.gate.moderate(text) {
            info!(
                event_name = "chat.turn.blocked",
                correlation_id,
                account_id = %id,
                category = category.as_str(),
                "turn refused by moderation"
            );
            return Ok(TurnOutcome::Blocked(BlockedReply {
                category,
                text: BLOCKED_REPLY.to_string(),
                free_limit,
            }));
        }

        let now = self.clock.now();
        let account = self.accounts.get_or_create(&id, now).await.map_err(persistence)?;
        let (mut evaluation, mut decision) = self.gate.entitle(account, now);

        if evaluation.normalized {
            info!(
                event_name = "chat.turn.premium_expired",
                correlation_id,
                account_id = %id,
                "expired premium window cleared"
            );
            // The stored record may have gained a grant since it was read.
            let stored =
                self.accounts.normalize_expired_premium(&id, now).await.map_err(persistence)?;
            (evaluation, decision) = self.gate.entitle(stored, now);
        }
        let premium = matches!(evaluation.decision, EntitlementDecision::Proceed { premium: true });
        let account = evaluation.account;

        if let GateDecision::QuotaExceeded { messages_used, free_limit } = decision {
            info!(
                event_name = "chat.turn.quota_exceeded",
                correlation_id,
                account_id = %id,
                messages_used,
                free_limit,
                "free quota exhausted"
            );
            return Ok(TurnOutcome::QuotaExceeded(QuotaReply {
                message: quota_message(free_limit),
                messages_used,
                free_limit,
            }));
        }

        let window = MemoryWindow::sanitize(&request.history, self.memory_limits);
        if let GateDecision::Clarify { domain, clarification } =
            self.gate.assess(&window, text).map_err(policy_failure)?
        {
            info!(
                event_name = "chat.turn.clarify",
                correlation_id,
                account_id = %id,
                domain = domain.as_str(),
                window_len = window.len(),
                "vague turn answered with clarification"
            );
            return Ok(TurnOutcome::Clarification(ClarificationReply {
                domain,
                text: clarification.text,
                suggestions: clarification.suggestions,
                messages_used: account.messages_used,
                free_limit,
                is_premium: premium,
                premium_until: account.premium_until,
            }));
        }

        let domain = self.gate.classify_domain(text);
        let completion_request = CompletionRequest {
            messages: self.composer.compose(&window, text),
            params: self.params.clone(),
        };

        let started = Instant::now();
        let raw = self.provider.complete(&completion_request).await.map_err(|error| {
            warn!(
                event_name = "chat.turn.provider_failed",
                correlation_id,
                account_id = %id,
                provider = self.provider.name(),
                error = %error,
                "completion call failed"
            );
            ApplicationError::from(error)
        })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let shaped = self.post_processor.finish(&raw, domain);
        let updated =
            self.accounts.increment_usage(&id, self.clock.now()).await.map_err(persistence)?;

        info!(
            event_name = "chat.turn.answered",
            correlation_id,
            account_id = %id,
            domain = domain.as_str(),
            window_len = window.len(),
            latency_ms,
            messages_used = updated.messages_used,
            premium,
            "turn answered"
        );

        Ok(TurnOutcome::Answered(AnsweredReply {
            domain,
            text: shaped.text,
            suggestions: shaped.suggestions,
            messages_used: updated.messages_used,
            free_limit,
            is_premium: premium,
            premium_until: account.premium_until,
        }))
    }
}
