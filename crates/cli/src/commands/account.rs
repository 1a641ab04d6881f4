use std::future::Future;
use std::sync::Arc;

use normbot_agent::{AccountService, SystemClock};
use normbot_core::config::{AppConfig, LoadOptions};
use normbot_core::errors::ApplicationError;
use normbot_db::repositories::SqlAccountRepository;
use normbot_db::{connect_with_settings, migrations};
use serde_json::{json, Value};

use crate::commands::CommandResult;

type Failure = (&'static str, String, u8);

pub fn status(external_id: &str) -> CommandResult {
    with_service("account", |service| async move {
        let status = service.status(external_id).await.map_err(application_failure)?;
        let message = format!(
            "{} of {} free messages used; premium {}",
            status.messages_used,
            status.free_limit,
            if status.is_premium { "active" } else { "inactive" }
        );
        Ok::<_, Failure>((message, json!(status)))
    })
}

pub fn grant(external_id: &str, payment_ref: Option<&str>) -> CommandResult {
    with_service("grant", |service| async move {
        let grant =
            service.activate_premium(external_id, payment_ref).await.map_err(application_failure)?;
        let message = match grant.premium_until {
            Some(until) => format!("premium active until {}", until.to_rfc3339()),
            None => "premium grant recorded".to_string(),
        };
        Ok::<_, Failure>((message, json!(grant)))
    })
}

fn application_failure(error: ApplicationError) -> Failure {
    match error {
        ApplicationError::Validation(message) => ("validation", message, 2),
        other => ("persistence", other.to_string(), 5),
    }
}

fn with_service<F, Fut>(command: &str, operation: F) -> CommandResult
where
    F: FnOnce(Arc<AccountService>) -> Fut,
    Fut: Future<Output = Result<(String, Value), Failure>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let service = Arc::new(AccountService::new(
            Arc::new(SqlAccountRepository::new(pool.clone())),
            config.gate.entitlement_evaluator(),
            Arc::new(SystemClock),
        ));
        let outcome = operation(service).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok((message, data)) => CommandResult::success_with(command, message, Some(data)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}
