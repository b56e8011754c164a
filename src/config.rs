//! Application-level configuration loading: round rules, alphabet, validator and leaderboard
//! settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{letters::Alphabet, round::RoundRules};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PLACE_CHAIN_BACK_CONFIG_PATH";

const DEFAULT_VALIDATOR_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_VALIDATOR_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_VALIDATOR_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_COUNTRY: &str = "🇺🇳";
const DEFAULT_LEADERBOARD_SIZE: usize = 10;
/// The board never shows more than ten players.
const MAX_LEADERBOARD_SIZE: usize = 10;
const DEFAULT_SESSION_GRACE_SECS: u64 = 300;

/// Settings for the generative place-name oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Base URL of the generative language API.
    pub endpoint: String,
    /// Model used for `generateContent` calls.
    pub model: String,
    /// Upper bound for a single validation call.
    pub timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VALIDATOR_ENDPOINT.into(),
            model: DEFAULT_VALIDATOR_MODEL.into(),
            timeout: Duration::from_millis(DEFAULT_VALIDATOR_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: RoundRules,
    alphabet: Alphabet,
    validator: ValidatorConfig,
    default_country: String,
    leaderboard_size: usize,
    session_grace: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        initial_time_secs = app_config.rules.initial_time_secs,
                        letters = app_config.alphabet.letters().len(),
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document; absent keys keep their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Rules applied to new rounds.
    pub fn rules(&self) -> RoundRules {
        self.rules
    }

    /// Letters a round may ask for.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Oracle settings.
    pub fn validator(&self) -> &ValidatorConfig {
        &self.validator
    }

    /// Country stored with scores when the player has none.
    pub fn default_country(&self) -> &str {
        &self.default_country
    }

    /// Number of entries returned by the leaderboard.
    pub fn leaderboard_size(&self) -> usize {
        self.leaderboard_size
    }

    /// How long a finished round stays readable before it is dropped.
    pub fn session_grace(&self) -> Duration {
        self.session_grace
    }

    /// Replace the alphabet.
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    /// Replace the oracle timeout.
    pub fn with_validator_timeout(mut self, timeout: Duration) -> Self {
        self.validator.timeout = timeout;
        self
    }

    /// Replace the finished-round grace period.
    pub fn with_session_grace(mut self, grace: Duration) -> Self {
        self.session_grace = grace;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: RoundRules::default(),
            alphabet: Alphabet::latin(),
            validator: ValidatorConfig::default(),
            default_country: DEFAULT_COUNTRY.into(),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            session_grace: Duration::from_secs(DEFAULT_SESSION_GRACE_SECS),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    rules: Option<RoundRules>,
    alphabet: Option<String>,
    validator: RawValidator,
    default_country: Option<String>,
    leaderboard_size: Option<usize>,
    session_grace_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawValidator {
    endpoint: Option<String>,
    model: Option<String>,
    timeout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let validator = ValidatorConfig {
            endpoint: value
                .validator
                .endpoint
                .unwrap_or(defaults.validator.endpoint),
            model: value.validator.model.unwrap_or(defaults.validator.model),
            timeout: value
                .validator
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.validator.timeout),
        };

        Self {
            rules: value.rules.unwrap_or(defaults.rules),
            alphabet: value
                .alphabet
                .map(|letters| Alphabet::new(letters.chars()))
                .unwrap_or(defaults.alphabet),
            validator,
            default_country: value
                .default_country
                .filter(|country| !country.trim().is_empty())
                .unwrap_or(defaults.default_country),
            leaderboard_size: value
                .leaderboard_size
                .filter(|size| *size > 0)
                .map(|size| size.min(MAX_LEADERBOARD_SIZE))
                .unwrap_or(defaults.leaderboard_size),
            session_grace: value
                .session_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_grace),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.rules(), RoundRules::default());
        assert_eq!(config.alphabet(), &Alphabet::latin());
        assert_eq!(config.leaderboard_size(), 10);
        assert_eq!(config.default_country(), "🇺🇳");
        assert_eq!(config.validator(), &ValidatorConfig::default());
    }

    #[test]
    fn partial_rules_fill_missing_fields() {
        let config = AppConfig::from_json(
            r#"{ "rules": { "initial_time_secs": 45 }, "alphabet": "abcdefghijklmnoprstuvw" }"#,
        )
        .unwrap();

        assert_eq!(config.rules().initial_time_secs, 45);
        assert_eq!(config.rules().score_milestone, 5);
        assert!(!config.alphabet().contains('Q'));
        assert_eq!(config.alphabet().letters().len(), 22);
    }

    #[test]
    fn validator_settings_are_read() {
        let config = AppConfig::from_json(
            r#"{ "validator": { "model": "gemini-pro", "timeout_ms": 2500 } }"#,
        )
        .unwrap();
        assert_eq!(config.validator().model, "gemini-pro");
        assert_eq!(config.validator().timeout, Duration::from_millis(2500));
        assert_eq!(config.validator().endpoint, DEFAULT_VALIDATOR_ENDPOINT);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = AppConfig::from_json(
            r#"{ "leaderboard_size": 0, "default_country": "  ", "alphabet": "123" }"#,
        )
        .unwrap();
        assert_eq!(config.leaderboard_size(), 10);
        assert_eq!(config.default_country(), "🇺🇳");
        assert_eq!(config.alphabet(), &Alphabet::latin());
    }

    #[test]
    fn leaderboard_size_is_capped_at_ten() {
        let config = AppConfig::from_json(r#"{ "leaderboard_size": 50 }"#).unwrap();
        assert_eq!(config.leaderboard_size(), 10);

        let config = AppConfig::from_json(r#"{ "leaderboard_size": 5 }"#).unwrap();
        assert_eq!(config.leaderboard_size(), 5);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json("{ rules: ").is_err());
    }
}
