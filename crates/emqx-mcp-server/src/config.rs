//! Broker connection settings.
//!
//! Credentials are read once at startup from the environment (optionally
//! seeded from a `.env` file) and handed to the transport explicitly.

use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default bound on a single broker HTTP call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable names, primary first, legacy fallback second.
const URL_VARS: [&str; 2] = ["BROKER_API_URL", "EMQX_API_URL"];
const KEY_VARS: [&str; 2] = ["BROKER_API_KEY", "EMQX_API_KEY"];
const SECRET_VARS: [&str; 2] = ["BROKER_API_SECRET", "EMQX_API_SECRET"];

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid broker URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Base URL and API key pair for the broker management API.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    /// Absolute http(s) URL without a trailing slash, e.g. `https://host:8443/api/v5`.
    pub base_url: String,
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("base_url", &self.base_url)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl BrokerCredentials {
    /// Build credentials, validating and normalizing the base URL.
    pub fn new(base_url: &str, key: &str, secret: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            key: key.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup (tests inject a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, &URL_VARS)?;
        let key = required(&lookup, &KEY_VARS)?;
        let secret = required(&lookup, &SECRET_VARS)?;
        Self::new(&url, &key, &secret)
    }
}

/// Everything the server needs for its lifetime.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub credentials: BrokerCredentials,
    pub timeout: Duration,
}

impl ServerConfig {
    /// Load `.env` (or `env_file`), then read credentials from the environment.
    ///
    /// Variables already set in the process environment win over the file.
    pub fn load(env_file: Option<&Path>, timeout: Duration) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
            None => {
                // A missing .env is the common case.
                dotenvy::dotenv().ok();
            }
        }

        Ok(Self {
            credentials: BrokerCredentials::from_env()?,
            timeout,
        })
    }
}

fn required<F>(lookup: &F, names: &[&'static str; 2]) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(*name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(names[0]))
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".to_string()));
    }
    Ok(trimmed.to_string())
}
