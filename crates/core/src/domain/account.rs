use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque caller identifier (the Telegram user id in production).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Usage and entitlement state of a single caller.
///
/// `is_premium` implies `premium_until.is_some()`. A window that has already
/// ended must be cleared with [`Account::normalize_expired`] before the record
/// feeds any entitlement decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub messages_used: u32,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub last_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            messages_used: 0,
            is_premium: false,
            premium_until: None,
            last_payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_active_premium(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_until.is_some_and(|until| until > now)
    }

    /// True when the stored premium fields no longer describe an active window.
    pub fn needs_normalization(&self, now: DateTime<Utc>) -> bool {
        match self.premium_until {
            Some(until) => until <= now,
            None => self.is_premium,
        }
    }

    /// Clears an ended premium window. Returns whether anything changed;
    /// calling it again is a no-op. `messages_used` is left untouched.
    pub fn normalize_expired(&mut self, now: DateTime<Utc>) -> bool {
        if !self.needs_normalization(now) {
            return false;
        }
        self.is_premium = false;
        self.premium_until = None;
        self.updated_at = now;
        true
    }
}
