use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use normbot_core::domain::account::{Account, AccountId};

pub mod account;
pub mod memory;

pub use account::SqlAccountRepository;
pub use memory::InMemoryAccountRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("account `{0}` not found")]
    NotFound(String),
}

/// Storage for per-caller usage and entitlement records.
///
/// Every mutation is a single atomic step in the backing store so that
/// concurrent turns for the same caller never lose an update.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Returns the stored record, creating a fresh free-tier one on first contact.
    async fn get_or_create(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError>;

    async fn find(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Adds exactly one to `messages_used` and returns the updated record.
    async fn increment_usage(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError>;

    /// Clears an ended premium window. A no-op for records that are still
    /// active or were never premium.
    async fn normalize_expired_premium(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError>;

    /// Marks the caller premium until `until`. An existing later end date is
    /// kept, so a grant never shortens an active window.
    async fn grant_premium(
        &self,
        id: &AccountId,
        until: DateTime<Utc>,
        payment_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError>;
}
