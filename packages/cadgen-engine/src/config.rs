use crate::llm::catalog::KnownModel;
use anyhow::{Context, Result, bail};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MAX_ITERATIONS: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Process-wide configuration, read once at startup and immutable
/// thereafter. Every run of the director shares the same `Settings`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub log_level: String,
    pub max_iterations: usize,
    pub request_timeout: Duration,
}

impl Settings {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup function, so tests
    /// can supply values without mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("OPENROUTER_API_KEY is not set")?;

        let base_url = lookup("OPENROUTER_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let default_model =
            lookup("DEFAULT_MODEL").unwrap_or_else(|| KnownModel::default_model().id().to_string());

        let log_level = lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase();

        let max_iterations = match lookup("MAX_ITERATIONS") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_ITERATIONS is not a number: '{raw}'"))?,
            None => DEFAULT_MAX_ITERATIONS,
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("REQUEST_TIMEOUT is not a number: '{raw}'"))?,
            ),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let settings = Self {
            api_key,
            base_url,
            default_model,
            log_level,
            max_iterations,
            request_timeout,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            bail!(
                "invalid log level '{}', must be one of {:?}",
                self.log_level,
                VALID_LOG_LEVELS
            );
        }
        if self.max_iterations == 0 {
            bail!("MAX_ITERATIONS must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let settings = Settings::from_lookup(lookup_from(&[("OPENROUTER_API_KEY", "sk-test")]))
            .expect("minimal config should load");

        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.default_model, KnownModel::default_model().id());
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(
            settings.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn missing_api_key_is_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("OPENROUTER_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn overrides_are_honored() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("OPENROUTER_BASE_URL", "http://localhost:9999/v1/"),
            ("DEFAULT_MODEL", "mistralai/mistral-7b-instruct"),
            ("LOG_LEVEL", "DEBUG"),
            ("MAX_ITERATIONS", "5"),
            ("REQUEST_TIMEOUT", "120"),
        ]))
        .unwrap();

        // Trailing slash is normalized away so endpoint joins stay clean.
        assert_eq!(settings.base_url, "http://localhost:9999/v1");
        assert_eq!(settings.default_model, "mistralai/mistral-7b-instruct");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.max_iterations, 5);
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(
            Settings::from_lookup(lookup_from(&[
                ("OPENROUTER_API_KEY", "sk-test"),
                ("LOG_LEVEL", "verbose"),
            ]))
            .is_err()
        );
        assert!(
            Settings::from_lookup(lookup_from(&[
                ("OPENROUTER_API_KEY", "sk-test"),
                ("MAX_ITERATIONS", "0"),
            ]))
            .is_err()
        );
        assert!(
            Settings::from_lookup(lookup_from(&[
                ("OPENROUTER_API_KEY", "sk-test"),
                ("REQUEST_TIMEOUT", "soon"),
            ]))
            .is_err()
        );
    }
}
