use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use normbot_core::domain::account::{Account, AccountId};

use super::{AccountRepository, RepositoryError};
use crate::DbPool;

const ACCOUNT_COLUMNS: &str =
    "id, messages_used, is_premium, premium_until, last_payment_id, created_at, updated_at";

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so that SQL string comparison orders them correctly.
fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let messages_used: i64 =
        row.try_get("messages_used").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_premium: bool =
        row.try_get("is_premium").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let premium_until_str: Option<String> =
        row.try_get("premium_until").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_payment_id: Option<String> =
        row.try_get("last_payment_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let messages_used = u32::try_from(messages_used)
        .map_err(|_| RepositoryError::Decode(format!("messages_used out of range: {messages_used}")))?;
    let premium_until = premium_until_str
        .as_deref()
        .map(|raw| decode_timestamp("premium_until", raw))
        .transpose()?;

    Ok(Account {
        id: AccountId(id),
        messages_used,
        is_premium,
        premium_until,
        last_payment_id,
        created_at: decode_timestamp("created_at", &created_at_str)?,
        updated_at: decode_timestamp("updated_at", &updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn get_or_create(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let now_str = encode_timestamp(now);
        sqlx::query(
            "INSERT INTO account (id, messages_used, is_premium, created_at, updated_at)
             VALUES (?, 0, 0, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&id.0)
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        self.find(id).await?.ok_or_else(|| RepositoryError::NotFound(id.0.clone()))
    }

    async fn find(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_account(r)?)),
            None => Ok(None),
        }
    }

    async fn increment_usage(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let now_str = encode_timestamp(now);
        let row = sqlx::query(&format!(
            "INSERT INTO account (id, messages_used, is_premium, created_at, updated_at)
             VALUES (?, 1, 0, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 messages_used = messages_used + 1,
                 updated_at = excluded.updated_at
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&id.0)
        .bind(&now_str)
        .bind(&now_str)
        .fetch_one(&self.pool)
        .await?;

        row_to_account(&row)
    }

    async fn normalize_expired_premium(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let now_str = encode_timestamp(now);
        sqlx::query(
            "UPDATE account
             SET is_premium = 0, premium_until = NULL, updated_at = ?
             WHERE id = ?
               AND ((premium_until IS NOT NULL AND premium_until <= ?)
                    OR (premium_until IS NULL AND is_premium = 1))",
        )
        .bind(&now_str)
        .bind(&id.0)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        self.find(id).await?.ok_or_else(|| RepositoryError::NotFound(id.0.clone()))
    }

    async fn grant_premium(
        &self,
        id: &AccountId,
        until: DateTime<Utc>,
        payment_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Account, RepositoryError> {
        let now_str = encode_timestamp(now);
        let row = sqlx::query(&format!(
            "INSERT INTO account (id, messages_used, is_premium, premium_until, last_payment_id,
                                  created_at, updated_at)
             VALUES (?, 0, 1, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 is_premium = 1,
                 premium_until = CASE
                     WHEN premium_until IS NOT NULL AND premium_until > excluded.premium_until
                         THEN premium_until
                     ELSE excluded.premium_until
                 END,
                 last_payment_id = COALESCE(excluded.last_payment_id, last_payment_id),
                 updated_at = excluded.updated_at
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&id.0)
        .bind(encode_timestamp(until))
        .bind(payment_ref)
        .bind(&now_str)
        .bind(&now_str)
        .fetch_one(&self.pool)
        .await?;

        row_to_account(&row)
    }
}
