use std::sync::Arc;

use normbot_agent::{
    AccountService, ChatRuntime, CompletionProvider, OpenAiCompletionProvider, ProviderError,
    SystemClock,
};
use normbot_core::config::{AppConfig, ConfigError};
use normbot_core::policy::{PolicyError, PolicyTables};
use normbot_db::repositories::{AccountRepository, SqlAccountRepository};
use normbot_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub chat_runtime: Arc<ChatRuntime>,
    pub account_service: Arc<AccountService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("policy tables could not be loaded: {0}")]
    Policy(#[from] PolicyError),
    #[error("llm client could not be built: {0}")]
    Provider(#[source] ProviderError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg(test)]
pub async fn bootstrap(
    options: normbot_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let tables = match &config.policy.path {
        Some(path) => PolicyTables::load(path)?,
        None => PolicyTables::default(),
    };

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let provider = OpenAiCompletionProvider::from_config(&config.llm)
        .map_err(BootstrapError::Provider)?;
    if !provider.is_configured() {
        warn!(
            event_name = "system.bootstrap.llm_credential_missing",
            correlation_id = "bootstrap",
            "llm api key is not set; chat requests will fail with CONFIG_ERROR"
        );
    }

    let accounts: Arc<dyn AccountRepository> = Arc::new(SqlAccountRepository::new(db_pool.clone()));
    let chat_runtime = ChatRuntime::new(&config, &tables, accounts.clone(), Arc::new(provider))?;
    let account_service = AccountService::new(
        accounts,
        config.gate.entitlement_evaluator(),
        Arc::new(SystemClock),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        policy_version = tables.version,
        model = %config.llm.model,
        free_limit = config.gate.free_limit,
        "application bootstrap complete"
    );

    Ok(Application {
        config,
        db_pool,
        chat_runtime: Arc::new(chat_runtime),
        account_service: Arc::new(account_service),
    })
}
