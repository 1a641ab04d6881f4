use chrono::{DateTime, Utc};

use normbot_core::config::GateConfig;
use normbot_core::domain::account::Account;
use normbot_core::entitlement::{EntitlementDecision, EntitlementEvaluator, Evaluation};
use normbot_core::policy::{
    Clarification, ClarificationCatalog, DomainClassifier, DomainTag, ModerationCategory,
    ModerationFilter, ModerationVerdict, PolicyError, PolicyTables,
};

use crate::conversation::{MemoryWindow, Sufficiency, SufficiencyPolicy};

/// Outcome of a single deterministic gate. Only `Proceed` lets the turn
/// continue towards the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Blocked(ModerationCategory),
    QuotaExceeded { messages_used: u32, free_limit: u32 },
    Clarify { domain: DomainTag, clarification: Clarification },
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::Blocked(ModerationCategory::Profanity) => "blocked_profanity",
            Self::Blocked(ModerationCategory::SexualContent) => "blocked_sexual_content",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Clarify { .. } => "needs_clarification",
        }
    }
}

/// The pre-model gates, in the order the runtime applies them.
#[derive(Debug)]
pub struct TurnGate {
    moderation: ModerationFilter,
    entitlement: EntitlementEvaluator,
    sufficiency: SufficiencyPolicy,
    domains: DomainClassifier,
    clarifications: ClarificationCatalog,
}

impl TurnGate {
    pub fn new(tables: &PolicyTables, gate: &GateConfig) -> Result<Self, PolicyError> {
        Ok(Self {
            moderation: ModerationFilter::from_tables(tables),
            entitlement: gate.entitlement_evaluator(),
            sufficiency: SufficiencyPolicy::from(gate),
            domains: DomainClassifier::from_tables(tables),
            clarifications: ClarificationCatalog::new(&tables.clarifications)?,
        })
    }

    pub fn entitlement(&self) -> &EntitlementEvaluator {
        &self.entitlement
    }

    pub fn classify_domain(&self, text: &str) -> DomainTag {
        self.domains.classify(text)
    }

    pub fn moderate(&self, text: &str) -> GateDecision {
        match self.moderation.check(text) {
            ModerationVerdict::Clean => GateDecision::Proceed,
            ModerationVerdict::Blocked(category) => GateDecision::Blocked(category),
        }
    }

    /// Evaluates quota and premium state. The returned evaluation carries the
    /// normalized record, which callers must persist when `normalized` is set.
    pub fn entitle(&self, account: Account, now: DateTime<Utc>) -> (Evaluation, GateDecision) {
        let evaluation = self.entitlement.evaluate(account, now);
        let decision = match evaluation.decision {
            EntitlementDecision::Proceed { .. } => GateDecision::Proceed,
            EntitlementDecision::QuotaExceeded { messages_used, free_limit } => {
                GateDecision::QuotaExceeded { messages_used, free_limit }
            }
        };
        (evaluation, decision)
    }

    /// Clarify instead of calling the model when the turn is vague and the
    /// window holds no earlier user context.
    pub fn assess(&self, window: &MemoryWindow, text: &str) -> Result<GateDecision, PolicyError> {
        if self.sufficiency.classify(window, text) == Sufficiency::Sufficient {
            return Ok(GateDecision::Proceed);
        }

        let domain = self.domains.classify(text);
        let clarification = self.clarifications.render(domain, text)?;
        Ok(GateDecision::Clarify { domain, clarification })
    }
}
