//! Configuration module
//!
//! YAML configuration with environment variable expansion and validation.
//! Embedding applications typically load this once at startup and build
//! the authenticator from it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - keeps the placeholder if the variable is not set
/// - `${VAR_NAME:-default}` - falls back to the default value
fn expand_env_vars(s: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}").unwrap();
    let mut result = String::with_capacity(s.len());
    let mut last_match = 0;

    for cap in re.captures_iter(s) {
        let full_match = cap.get(0).unwrap();
        let var_name = cap.get(1).unwrap().as_str();

        result.push_str(&s[last_match..full_match.start()]);

        match std::env::var(var_name) {
            Ok(value) => result.push_str(&value),
            Err(_) => match cap.get(2) {
                Some(default) => result.push_str(default.as_str()),
                None => result.push_str(full_match.as_str()),
            },
        }

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

/// Serde helper applying [`expand_env_vars`] to a deserialized string.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Top-level configuration
///
/// # Example
///
/// ```yaml
/// auth:
///   keyword: "FirebaseToken"
///   check_revoked: false
/// provider:
///   project_id: "${FIREBASE_PROJECT_ID}"
///   key_ttl_secs: 3600
///   timeout_secs: 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    pub provider: ProviderConfig,
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.keyword.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Auth keyword cannot be empty".into(),
            ));
        }

        if self.provider.project_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Provider project_id cannot be empty".into(),
            ));
        }
        if self.provider.project_id.contains("${") {
            return Err(ConfigError::ValidationError(format!(
                "Provider project_id '{}' contains an unresolved placeholder",
                self.provider.project_id
            )));
        }

        for url in [&self.provider.keys_url, &self.provider.lookup_url]
            .into_iter()
            .flatten()
        {
            if !is_valid_http_url(url) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid endpoint '{url}': must start with http:// or https://"
                )));
            }
        }

        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Provider timeout_secs must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Authenticator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Scheme keyword matched in the Authorization header.
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// Check token revocation on every request. Off by default: the check
    /// costs an extra account lookup per request.
    #[serde(default)]
    pub check_revoked: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            check_revoked: false,
        }
    }
}

fn default_keyword() -> String {
    crate::auth::header::DEFAULT_KEYWORD.to_string()
}

/// Identity-provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Firebase project id. Supports `${VAR}` and `${VAR:-default}`
    /// expansion.
    #[serde(deserialize_with = "deserialize_with_env")]
    pub project_id: String,

    /// Override the signing-key endpoint (emulators, tests).
    #[serde(default)]
    pub keys_url: Option<String>,

    /// Override the account-lookup endpoint (emulators, tests).
    #[serde(default)]
    pub lookup_url: Option<String>,

    /// How long fetched signing keys are served from cache, in seconds.
    #[serde(default = "default_key_ttl")]
    pub key_ttl_secs: u64,

    /// Timeout for each provider request, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_key_ttl() -> u64 {
    3600
}

fn default_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config() -> ProviderConfig {
        ProviderConfig {
            project_id: "demo-project".into(),
            keys_url: None,
            lookup_url: None,
            key_ttl_secs: default_key_ttl(),
            timeout_secs: default_timeout(),
        }
    }

    #[test]
    fn test_default_auth_config() {
        let config = AuthConfig::default();
        assert_eq!(config.keyword, "FirebaseToken");
        assert!(!config.check_revoked);
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = "provider:\n  project_id: demo-project\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.auth.keyword, "FirebaseToken");
        assert!(!config.auth.check_revoked);
        assert_eq!(config.provider.project_id, "demo-project");
        assert_eq!(config.provider.key_ttl_secs, 3600);
        assert_eq!(config.provider.timeout_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        let expanded = expand_env_vars("${KAGI_MISSING_VAR:-fallback}");
        assert_eq!(expanded, "fallback");
    }

    #[test]
    fn test_expand_env_vars_keeps_unresolved_placeholder() {
        let expanded = expand_env_vars("prefix-${KAGI_MISSING_VAR}-suffix");
        assert_eq!(expanded, "prefix-${KAGI_MISSING_VAR}-suffix");
    }

    #[test]
    fn test_project_id_env_expansion() {
        std::env::set_var("KAGI_TEST_PROJECT", "env-project");
        let yaml = "provider:\n  project_id: \"${KAGI_TEST_PROJECT}\"\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.project_id, "env-project");
        std::env::remove_var("KAGI_TEST_PROJECT");
    }

    #[test]
    fn test_validation_empty_project_id() {
        let config = Config {
            auth: AuthConfig::default(),
            provider: ProviderConfig {
                project_id: "".into(),
                ..provider_config()
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_unresolved_placeholder() {
        let config = Config {
            auth: AuthConfig::default(),
            provider: ProviderConfig {
                project_id: "${FIREBASE_PROJECT_ID}".into(),
                ..provider_config()
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bad_endpoint() {
        let config = Config {
            auth: AuthConfig::default(),
            provider: ProviderConfig {
                lookup_url: Some("ftp://example.com".into()),
                ..provider_config()
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = Config {
            auth: AuthConfig::default(),
            provider: ProviderConfig {
                timeout_secs: 0,
                ..provider_config()
            },
        };
        assert!(config.validate().is_err());
    }
}
