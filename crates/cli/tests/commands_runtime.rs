use std::env;
use std::sync::{Mutex, OnceLock};

use normbot_cli::commands::{account, config, doctor, migrate};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("NORMBOT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("NORMBOT_DATABASE_URL", "postgres://localhost/normbot")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_after_migrate_with_credential() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("NORMBOT_DATABASE_URL", &url), ("NORMBOT_LLM_API_KEY", "sk-test")], || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = doctor::run(true);
        let report = parse_payload(&result.output);
        assert_eq!(result.exit_code, 0, "unexpected report: {report}");
        assert_eq!(report["overall_status"], "pass");

        let names: Vec<&str> = report["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(
            names,
            [
                "config_validation",
                "llm_credential",
                "policy_tables",
                "database_connectivity",
                "pending_migrations"
            ]
        );
    });
}

#[test]
fn doctor_flags_missing_credential_and_pending_migrations() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("NORMBOT_DATABASE_URL", &url)], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        let status_of = |name: &str| {
            report["checks"]
                .as_array()
                .expect("checks")
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .expect("check present")
        };
        assert_eq!(status_of("llm_credential"), "fail");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("pending_migrations"), "fail");
    });
}

#[test]
fn doctor_human_output_lists_checks() {
    with_env(&[("NORMBOT_DATABASE_URL", "postgres://nope")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] llm_credential"));
    });
}

#[test]
fn config_redacts_secrets_and_reports_sources() {
    with_env(
        &[
            ("NORMBOT_DATABASE_URL", "sqlite::memory:"),
            ("OPENAI_API_KEY", "sk-proj-verysecret"),
            ("NORMBOT_SERVER_ADMIN_TOKEN", "admin-token-value"),
        ],
        || {
            let output = config::run();
            assert!(output.contains("- database.url = sqlite::memory: (source: env (NORMBOT_DATABASE_URL))"));
            assert!(output.contains("- llm.api_key = sk-*** (source: env (OPENAI_API_KEY))"));
            assert!(output.contains("- server.admin_token = admin-*** (source: env (NORMBOT_SERVER_ADMIN_TOKEN))"));
            assert!(output.contains("- gate.free_limit = 3 (source: default)"));
            assert!(!output.contains("verysecret"));
            assert!(!output.contains("token-value"));
        },
    );
}

#[test]
fn grant_then_account_reports_active_premium() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("NORMBOT_DATABASE_URL", &url)], || {
        let before = parse_payload(&account::status("314159").output);
        assert_eq!(before["status"], "ok");
        assert_eq!(before["data"]["messages_used"], 0);
        assert_eq!(before["data"]["is_premium"], false);

        let granted = account::grant("314159", Some("pay-9"));
        assert_eq!(granted.exit_code, 0);
        let granted = parse_payload(&granted.output);
        assert_eq!(granted["command"], "grant");
        assert_eq!(granted["data"]["is_premium"], true);
        assert_eq!(granted["data"]["last_payment_id"], "pay-9");

        let after = parse_payload(&account::status("314159").output);
        assert_eq!(after["data"]["is_premium"], true);
        assert_eq!(after["data"]["free_limit"], 3);
    });
}

#[test]
fn account_rejects_blank_identifier() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_url(&dir);

    with_env(&[("NORMBOT_DATABASE_URL", &url)], || {
        let result = account::status("   ");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "validation");
        assert_eq!(payload["message"], "telegramId is required");
    });
}

fn file_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("normbot.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "NORMBOT_DATABASE_URL",
        "NORMBOT_DATABASE_MAX_CONNECTIONS",
        "NORMBOT_DATABASE_TIMEOUT_SECS",
        "NORMBOT_LLM_API_KEY",
        "NORMBOT_LLM_BASE_URL",
        "NORMBOT_LLM_MODEL",
        "NORMBOT_LLM_TIMEOUT_SECS",
        "NORMBOT_LLM_MAX_OUTPUT_TOKENS",
        "NORMBOT_LLM_TEMPERATURE",
        "NORMBOT_GATE_FREE_LIMIT",
        "NORMBOT_GATE_PREMIUM_PERIOD_DAYS",
        "NORMBOT_POLICY_PATH",
        "NORMBOT_SERVER_BIND_ADDRESS",
        "NORMBOT_SERVER_PORT",
        "NORMBOT_SERVER_ADMIN_TOKEN",
        "NORMBOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "NORMBOT_LOGGING_LEVEL",
        "NORMBOT_LOGGING_FORMAT",
        "NORMBOT_LOG_LEVEL",
        "NORMBOT_LOG_FORMAT",
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
