//! Request pipeline for the drafting and labeling standards assistant.
//!
//! A chat turn flows through a fixed sequence of deterministic gates before
//! the model is ever called:
//! 1. **Moderation** (`normbot_core::policy::moderation`) - refuse banned content
//! 2. **Entitlement** (`normbot_core::entitlement`) - free quota or active premium
//! 3. **Context sufficiency** (`conversation`) - ask a clarifying question instead of guessing
//! 4. **Prompt composition** (`prompt`) and **model call** (`llm`)
//! 5. **Post-processing** (`response`) - disclaimer and quick-reply suggestions
//!
//! `runtime::ChatRuntime` wires these together; `guardrails` holds the
//! decision type the gates produce. `account::AccountService` covers the
//! status and premium grant operations used outside the chat turn.
//!
//! The model never decides quota, moderation, or entitlement outcomes.

pub mod account;
pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod response;
pub mod runtime;

pub use account::{AccountService, AccountStatus, PremiumGrant};
pub use conversation::{MemoryLimits, MemoryWindow, Sufficiency, SufficiencyPolicy};
pub use guardrails::{GateDecision, TurnGate};
pub use llm::{
    CompletionProvider, CompletionRequest, GenerationParams, OpenAiCompletionProvider,
    ProviderError, EMPTY_COMPLETION_PLACEHOLDER,
};
pub use prompt::{ChatMessage, PromptComposer};
pub use response::{ResponsePostProcessor, ShapedAnswer, STANDARDS_DISCLAIMER};
pub use runtime::{
    AnsweredReply, BlockedReply, ChatRuntime, ClarificationReply, Clock, FixedClock, QuotaReply,
    SystemClock, TurnOutcome, TurnRequest, BLOCKED_REPLY,
};
