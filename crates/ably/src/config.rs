use std::env;

/// Broker configuration read from the environment at startup. Mirrors the
/// database crate's `DatabaseConnectionInfo::from_env` in shape: one
/// `from_env` constructor, no partial/builder state, and a clear narrow
/// error when a required variable is absent.
#[derive(Debug, Clone)]
pub struct AblyConfig {
    /// `keyName:keySecret`, used both for REST authentication and to verify
    /// presence webhook signatures.
    pub api_key: String,
    /// Overridable for tests against a mock REST endpoint; defaults to
    /// Ably's public REST host.
    pub rest_base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ABLY_API_KEY is not set")]
    MissingApiKey,
}

impl AblyConfig {
    /// Reads `ABLY_API_KEY` (required) and `ABLY_REST_BASE_URL` (optional,
    /// defaults to `https://rest.ably.io`) from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ABLY_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;
        let rest_base_url = env::var("ABLY_REST_BASE_URL")
            .unwrap_or_else(|_| "https://rest.ably.io".to_string());

        Ok(Self {
            api_key,
            rest_base_url,
        })
    }
}
