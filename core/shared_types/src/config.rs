use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pipeline-wide configuration, loaded from an optional TOML file (spec
/// §6's Configuration table) with environment variables layered on top,
/// following the donor `config_service`'s `load_single_config`: `{{VAR}}`
/// / `${VAR}` occurrences in the TOML text are substituted from the
/// process environment before parsing, so secrets never sit in the file
/// verbatim.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_max_autonomy_risk")]
    pub max_autonomy_risk: f32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_daily_quota")]
    pub daily_quota: u32,
    #[serde(default = "default_hourly_quota")]
    pub hourly_quota: u32,
    #[serde(default = "default_sandbox_root")]
    pub sandbox_root: String,
    #[serde(default = "default_allowed_commands")]
    pub allowed_commands: Vec<String>,
    /// Services that always qualify for enhanced synthesis regardless of
    /// severity (spec §4.1's "critical-service membership (configurable
    /// list)" enhanced-synthesis trigger).
    #[serde(default = "default_critical_services")]
    pub critical_services: Vec<String>,
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
    #[serde(default = "default_dle_ttl_s")]
    pub dle_ttl_s: u64,

    #[serde(default)]
    pub broker_url: String,
    #[serde(default)]
    pub llm_endpoint: String,
    #[serde(default)]
    pub llm_api_key: String,
    #[serde(default)]
    pub llm_model: String,
    #[serde(default)]
    pub embedding_model_id: String,
    #[serde(default)]
    pub history_index_endpoint: String,
    #[serde(default)]
    pub code_history_token: String,
    #[serde(default)]
    pub public_knowledge_key: String,

    #[serde(default = "default_store_path")]
    pub store_path: String,
}

fn default_max_autonomy_risk() -> f32 {
    0.3
}
fn default_confidence_threshold() -> f32 {
    0.8
}
fn default_daily_quota() -> u32 {
    50
}
fn default_hourly_quota() -> u32 {
    10
}
fn default_sandbox_root() -> String {
    "/var/lib/incident-pipeline/sandbox".to_string()
}
fn default_allowed_commands() -> Vec<String> {
    vec!["kubectl".to_string(), "sh".to_string()]
}
fn default_critical_services() -> Vec<String> {
    vec![
        "user-service".to_string(),
        "payment-service".to_string(),
        "auth-service".to_string(),
        "api-gateway".to_string(),
    ]
}
fn default_namespace() -> String {
    "sandbox".to_string()
}
fn default_dle_ttl_s() -> u64 {
    300
}
fn default_store_path() -> String {
    "./data/pipeline.db".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_autonomy_risk: default_max_autonomy_risk(),
            confidence_threshold: default_confidence_threshold(),
            daily_quota: default_daily_quota(),
            hourly_quota: default_hourly_quota(),
            sandbox_root: default_sandbox_root(),
            allowed_commands: default_allowed_commands(),
            critical_services: default_critical_services(),
            default_namespace: default_namespace(),
            dle_ttl_s: default_dle_ttl_s(),
            broker_url: String::new(),
            llm_endpoint: String::new(),
            llm_api_key: String::new(),
            llm_model: String::new(),
            embedding_model_id: String::new(),
            history_index_endpoint: String::new(),
            code_history_token: String::new(),
            public_knowledge_key: String::new(),
            store_path: default_store_path(),
        }
    }
}

/// Substitutes `{{VAR}}` / `${VAR}` occurrences with the named environment
/// variable's value, leaving the placeholder untouched when the variable
/// is unset. Mirrors the donor `config_service::load_single_config`.
fn interpolate_env(content: &str) -> String {
    let pattern = Regex::new(r"(\{\{|\$\{)([a-zA-Z0-9_]+)(\}\}|\})").expect("valid regex");
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[2];
            std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Reads and parses a TOML config file at `path`, interpolating
/// environment variables first. Returns `None` when the file is absent or
/// fails to parse, so a missing overlay is never a hard error.
fn load_toml_overlay(path: &str) -> Option<PipelineConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    let processed = interpolate_env(&content);
    match toml::from_str(&processed) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            tracing::warn!(path, error = %err, "failed to parse TOML config overlay, ignoring");
            None
        }
    }
}

impl PipelineConfig {
    /// Loads the base configuration from an optional TOML file (path from
    /// `CONFIG_FILE`, default `config.toml`; absent file falls back to
    /// built-in defaults), then applies environment variables on top.
    /// Mirrors spec §6's env var table as the final, authoritative layer.
    pub fn from_env() -> Self {
        let config_path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = load_toml_overlay(&config_path).unwrap_or_default();

        if let Ok(v) = std::env::var("MAX_AUTONOMY_RISK") {
            if let Ok(parsed) = v.parse() {
                cfg.max_autonomy_risk = parsed;
            }
        }
        if let Ok(v) = std::env::var("CONFIDENCE_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                cfg.confidence_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("DAILY_QUOTA") {
            if let Ok(parsed) = v.parse() {
                cfg.daily_quota = parsed;
            }
        }
        if let Ok(v) = std::env::var("HOURLY_QUOTA") {
            if let Ok(parsed) = v.parse() {
                cfg.hourly_quota = parsed;
            }
        }
        if let Ok(v) = std::env::var("SANDBOX_ROOT") {
            cfg.sandbox_root = v;
        }
        if let Ok(v) = std::env::var("ALLOWED_COMMANDS") {
            cfg.allowed_commands = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("CRITICAL_SERVICES") {
            cfg.critical_services = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("DEFAULT_NAMESPACE") {
            cfg.default_namespace = v;
        }
        if let Ok(v) = std::env::var("DLE_TTL_S") {
            if let Ok(parsed) = v.parse() {
                cfg.dle_ttl_s = parsed;
            }
        }
        if let Ok(v) = std::env::var("BROKER_URL") {
            cfg.broker_url = v;
        }
        if let Ok(v) = std::env::var("LLM_ENDPOINT") {
            cfg.llm_endpoint = v;
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            cfg.llm_api_key = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            cfg.llm_model = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_MODEL_ID") {
            cfg.embedding_model_id = v;
        }
        if let Ok(v) = std::env::var("HISTORY_INDEX_ENDPOINT") {
            cfg.history_index_endpoint = v;
        }
        if let Ok(v) = std::env::var("CODE_HISTORY_TOKEN") {
            cfg.code_history_token = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_KNOWLEDGE_KEY") {
            cfg.public_knowledge_key = v;
        }
        if let Ok(v) = std::env::var("STORE_PATH") {
            cfg.store_path = v;
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_autonomy_risk, 0.3);
        assert_eq!(cfg.confidence_threshold, 0.8);
        assert_eq!(cfg.daily_quota, 50);
        assert_eq!(cfg.hourly_quota, 10);
        assert_eq!(cfg.default_namespace, "sandbox");
    }

    #[test]
    fn interpolate_env_substitutes_both_brace_syntaxes() {
        std::env::set_var("SHARED_TYPES_TEST_VAR", "resolved-value");
        assert_eq!(interpolate_env("{{SHARED_TYPES_TEST_VAR}}"), "resolved-value");
        assert_eq!(interpolate_env("${SHARED_TYPES_TEST_VAR}"), "resolved-value");
        std::env::remove_var("SHARED_TYPES_TEST_VAR");
    }

    #[test]
    fn interpolate_env_leaves_unset_variables_untouched() {
        assert_eq!(interpolate_env("${SHARED_TYPES_DEFINITELY_UNSET}"), "${SHARED_TYPES_DEFINITELY_UNSET}");
    }

    #[test]
    fn load_toml_overlay_applies_interpolated_values() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        std::env::set_var("SHARED_TYPES_TEST_LLM_KEY", "toml-key-123");
        writeln!(
            file,
            "{}",
            r#"llm_api_key = "{{SHARED_TYPES_TEST_LLM_KEY}}"
daily_quota = 75
"#
        )
        .expect("write config");

        let cfg = load_toml_overlay(file.path().to_str().unwrap()).expect("overlay should parse");
        assert_eq!(cfg.llm_api_key, "toml-key-123");
        assert_eq!(cfg.daily_quota, 75);

        std::env::remove_var("SHARED_TYPES_TEST_LLM_KEY");
    }

    #[test]
    fn load_toml_overlay_returns_none_for_missing_file() {
        assert!(load_toml_overlay("/nonexistent/path/to/config.toml").is_none());
    }
}
