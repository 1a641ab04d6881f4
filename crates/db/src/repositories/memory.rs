use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use normbot_core::domain::account::{Account, AccountId};

use super::{AccountRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountRepository {
    /// Seeds a record directly, bypassing the usage rules.
    pub async fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.0.clone(), account);
    }
}

#[async_trait::async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn get_or_create(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        let account =
            accounts.entry(id.0.clone()).or_insert_with(|| Account::new(id.clone(), now));
        Ok(account.clone())
    }

    async fn find(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id.0).cloned())
    }

    async fn increment_usage(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        let account =
            accounts.entry(id.0.clone()).or_insert_with(|| Account::new(id.clone(), now));
        account.messages_used = account.messages_used.saturating_add(1);
        account.updated_at = now;
        Ok(account.clone())
    }

    async fn normalize_expired_premium(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        let account =
            accounts.get_mut(&id.0).ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;
        account.normalize_expired(now);
        Ok(account.clone())
    }

    async fn grant_premium(
        &self,
        id: &AccountId,
        until: DateTime<Utc>,
        payment_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        let account =
            accounts.entry(id.0.clone()).or_insert_with(|| Account::new(id.clone(), now));
        account.is_premium = true;
        account.premium_until = Some(account.premium_until.map_or(until, |current| current.max(until)));
        if let Some(payment_ref) = payment_ref {
            account.last_payment_id = Some(payment_ref.to_string());
        }
        account.updated_at = now;
        Ok(account.clone())
    }
}
