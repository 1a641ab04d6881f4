//! Entitlement evaluation over the account record.
//!
//! States: `Free` (quota applies), `Premium` (active window, quota bypassed) and
//! `Expired` (window ended but not yet cleared). `Expired` is transient: the
//! evaluator normalizes the record and falls through to the `Free` path with
//! the existing `messages_used`. Usage is never reset and never incremented here.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::account::Account;

pub const DEFAULT_FREE_LIMIT: u32 = 3;
pub const DEFAULT_PREMIUM_PERIOD_DAYS: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementState {
    Free,
    Premium,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntitlementDecision {
    Proceed { premium: bool },
    QuotaExceeded { messages_used: u32, free_limit: u32 },
}

impl EntitlementDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// The record after normalization; this is what later steps must use.
    pub account: Account,
    /// State observed before normalization.
    pub observed: EntitlementState,
    pub decision: EntitlementDecision,
    /// Whether the premium fields were cleared and need to be persisted.
    pub normalized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitlementEvaluator {
    free_limit: u32,
    premium_period: Duration,
}

impl Default for EntitlementEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_LIMIT, DEFAULT_PREMIUM_PERIOD_DAYS)
    }
}

impl EntitlementEvaluator {
    pub fn new(free_limit: u32, premium_period_days: u32) -> Self {
        Self { free_limit, premium_period: Duration::days(i64::from(premium_period_days)) }
    }

    pub fn free_limit(&self) -> u32 {
        self.free_limit
    }

    pub fn premium_period(&self) -> Duration {
        self.premium_period
    }

    pub fn state(&self, account: &Account, now: DateTime<Utc>) -> EntitlementState {
        if account.has_active_premium(now) {
            EntitlementState::Premium
        } else if account.needs_normalization(now) {
            EntitlementState::Expired
        } else {
            EntitlementState::Free
        }
    }

    pub fn evaluate(&self, mut account: Account, now: DateTime<Utc>) -> Evaluation {
        let observed = self.state(&account, now);
        let normalized = account.normalize_expired(now);

        let decision = if account.has_active_premium(now) {
            EntitlementDecision::Proceed { premium: true }
        } else if account.messages_used >= self.free_limit {
            EntitlementDecision::QuotaExceeded {
                messages_used: account.messages_used,
                free_limit: self.free_limit,
            }
        } else {
            EntitlementDecision::Proceed { premium: false }
        };

        Evaluation { account, observed, decision, normalized }
    }

    /// End of the premium window after one more grant: extends from the later
    /// of `now` and the current window end, so an active window never shrinks.
    pub fn grant_until(&self, account: &Account, now: DateTime<Utc>) -> DateTime<Utc> {
        let base = account.premium_until.filter(|until| *until > now).unwrap_or(now);
        base + self.premium_period
    }
}
