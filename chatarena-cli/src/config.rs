//! Environment-backed configuration.
//!
//! Everything deployment-specific arrives through the environment (usually a
//! `.env` file loaded at startup): model endpoint and key, checkpoint
//! database, and the optional external tool credentials.

use thiserror::Error;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration failure: a required variable is missing or unparseable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Runtime configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Chat-completions API root (`OPENAI_API_BASE`).
    pub api_base: String,
    /// API key (`OPENAI_API_KEY`). Required.
    pub api_key: String,
    /// Model name (`OPENAI_MODEL`).
    pub model: String,
    /// Sampling temperature (`OPENAI_TEMPERATURE`), 0–2.
    pub temperature: Option<f32>,
    /// Checkpoint database (`DATABASE_URL`): a `postgres://` URL or a SQLite
    /// path. Unset means in-memory only — nothing survives exit.
    pub database_url: Option<String>,
    /// Alpha Vantage key (`STOCK_API_KEY`); the stock tool is registered only
    /// when present.
    pub stock_api_key: Option<String>,
    /// MCP endpoint (`MCP_SERVER_URL`); remote tool discovery runs only when
    /// present.
    pub mcp_server_url: Option<String>,
}

impl CliConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an arbitrary lookup, empty values treated
    /// as unset. Split out so tests need not mutate the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;
        let temperature = match get("OPENAI_TEMPERATURE") {
            None => None,
            Some(raw) => Some(raw.parse::<f32>().map_err(|_| ConfigError::InvalidVar {
                var: "OPENAI_TEMPERATURE",
                value: raw.clone(),
            })?),
        };

        Ok(Self {
            api_base: get("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            database_url: get("DATABASE_URL"),
            stock_api_key: get("STOCK_API_KEY"),
            mcp_server_url: get("MCP_SERVER_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name| map.get(name).map(|v| v.to_string())
    }

    /// **Scenario**: Only the API key is required; everything else defaults.
    #[test]
    fn minimal_config_uses_defaults() {
        let config = CliConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.temperature.is_none());
        assert!(config.database_url.is_none());
        assert!(config.mcp_server_url.is_none());
    }

    /// **Scenario**: A missing API key is a MissingVar error naming the variable.
    #[test]
    fn missing_api_key_is_an_error() {
        let err = CliConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("OPENAI_API_KEY")));
    }

    /// **Scenario**: Empty values count as unset.
    #[test]
    fn empty_values_are_unset() {
        let err = CliConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    /// **Scenario**: All variables round-trip; temperature parses as f32.
    #[test]
    fn full_config_round_trips() {
        let config = CliConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "http://localhost:8080/v1"),
            ("OPENAI_MODEL", "gemini-2.5-flash"),
            ("OPENAI_TEMPERATURE", "0.4"),
            ("DATABASE_URL", "postgres://localhost/chatarena"),
            ("STOCK_API_KEY", "demo"),
            ("MCP_SERVER_URL", "https://example.com/mcp"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.temperature, Some(0.4));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/chatarena")
        );
    }

    /// **Scenario**: A non-numeric temperature is rejected with the offending value.
    #[test]
    fn invalid_temperature_is_an_error() {
        let err = CliConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::InvalidVar { var, value } => {
                assert_eq!(var, "OPENAI_TEMPERATURE");
                assert_eq!(value, "warm");
            }
            other => panic!("expected InvalidVar, got {other:?}"),
        }
    }
}
