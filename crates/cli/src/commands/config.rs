use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use normbot_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl ToString, env_keys: &'static [&'static str]) -> Field {
    Field { key, value: value.to_string(), env_keys }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let gate = &config.gate;
    vec![
        field("database.url", &config.database.url, &["NORMBOT_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections,
            &["NORMBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        field("database.timeout_secs", config.database.timeout_secs, &["NORMBOT_DATABASE_TIMEOUT_SECS"]),
        field(
            "llm.api_key",
            redact_secret(config.llm.credential()),
            &["NORMBOT_LLM_API_KEY", "OPENAI_API_KEY"],
        ),
        field("llm.base_url", &config.llm.base_url, &["NORMBOT_LLM_BASE_URL"]),
        field("llm.model", &config.llm.model, &["NORMBOT_LLM_MODEL", "OPENAI_MODEL"]),
        field("llm.timeout_secs", config.llm.timeout_secs, &["NORMBOT_LLM_TIMEOUT_SECS"]),
        field(
            "llm.max_output_tokens",
            config.llm.max_output_tokens,
            &["NORMBOT_LLM_MAX_OUTPUT_TOKENS"],
        ),
        field("llm.temperature", config.llm.temperature, &["NORMBOT_LLM_TEMPERATURE"]),
        field("gate.free_limit", gate.free_limit, &["NORMBOT_GATE_FREE_LIMIT"]),
        field("gate.premium_period_days", gate.premium_period_days, &["NORMBOT_GATE_PREMIUM_PERIOD_DAYS"]),
        field("gate.raw_history_cap", gate.raw_history_cap, &[]),
        field("gate.history_window_cap", gate.history_window_cap, &[]),
        field("gate.turn_content_cap", gate.turn_content_cap, &[]),
        field("gate.min_chars", gate.min_chars, &[]),
        field("gate.context_min_chars", gate.context_min_chars, &[]),
        field(
            "gate.short_two_token_max_chars",
            gate.short_two_token_max_chars.map_or("<unset>".to_string(), |max| max.to_string()),
            &[],
        ),
        field(
            "policy.path",
            config
                .policy
                .path
                .as_ref()
                .map_or("<built-in>".to_string(), |path| path.display().to_string()),
            &["NORMBOT_POLICY_PATH"],
        ),
        field("server.bind_address", &config.server.bind_address, &["NORMBOT_SERVER_BIND_ADDRESS"]),
        field("server.port", config.server.port, &["NORMBOT_SERVER_PORT"]),
        field(
            "server.admin_token",
            redact_secret(config.server.admin_token.as_ref()),
            &["NORMBOT_SERVER_ADMIN_TOKEN"],
        ),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            &["NORMBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field("logging.level", &config.logging.level, &["NORMBOT_LOGGING_LEVEL", "NORMBOT_LOG_LEVEL"]),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["NORMBOT_LOGGING_FORMAT", "NORMBOT_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["normbot.toml", "config/normbot.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) => redact_token(secret.expose_secret()),
        None => "<unset>".to_string(),
    }
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_secret, redact_token};

    #[test]
    fn tokens_keep_only_their_prefix() {
        assert_eq!(redact_token("sk-proj-abcdef"), "sk-***");
        assert_eq!(redact_token("plainsecret"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some(&SecretString::from("sk-live-1"))), "sk-***");
    }

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: toml::Value = "[llm]\nmodel = \"gpt-4o\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
    }
}
