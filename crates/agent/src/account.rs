use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use normbot_core::domain::account::AccountId;
use normbot_core::entitlement::{EntitlementEvaluator, EntitlementState};
use normbot_core::errors::ApplicationError;
use normbot_db::repositories::{AccountRepository, RepositoryError};

use crate::runtime::Clock;

/// Usage snapshot as reported to the caller's client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub messages_used: u32,
    pub free_limit: u32,
    /// True only while the premium window is active.
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub state: EntitlementState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PremiumGrant {
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub last_payment_id: Option<String>,
}

pub(crate) fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn account_id(external_id: &str) -> Result<AccountId, ApplicationError> {
    let trimmed = external_id.trim();
    if trimmed.is_empty() {
        return Err(ApplicationError::Validation("telegramId is required".to_string()));
    }
    Ok(AccountId(trimmed.to_string()))
}

/// Read and grant operations on caller accounts, outside the chat pipeline.
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    entitlement: EntitlementEvaluator,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        entitlement: EntitlementEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { accounts, entitlement, clock }
    }

    pub async fn status(&self, external_id: &str) -> Result<AccountStatus, ApplicationError> {
        let id = account_id(external_id)?;
        let now = self.clock.now();
        let account = self.accounts.get_or_create(&id, now).await.map_err(persistence)?;

        Ok(AccountStatus {
            messages_used: account.messages_used,
            free_limit: self.entitlement.free_limit(),
            is_premium: account.has_active_premium(now),
            premium_until: account.premium_until,
            state: self.entitlement.state(&account, now),
        })
    }

    /// Grants one premium period, extending an active window rather than
    /// restarting it.
    pub async fn activate_premium(
        &self,
        external_id: &str,
        payment_ref: Option<&str>,
    ) -> Result<PremiumGrant, ApplicationError> {
        let id = account_id(external_id)?;
        let now = self.clock.now();
        let account = self.accounts.get_or_create(&id, now).await.map_err(persistence)?;
        let until = self.entitlement.grant_until(&account, now);

        let updated =
            self.accounts.grant_premium(&id, until, payment_ref, now).await.map_err(persistence)?;

        info!(
            event_name = "account.premium.granted",
            account_id = %id,
            premium_until = %until,
            has_payment_ref = payment_ref.is_some(),
            "premium period granted"
        );

        Ok(PremiumGrant {
            is_premium: updated.is_premium,
            premium_until: updated.premium_until,
            last_payment_id: updated.last_payment_id,
        })
    }
}
