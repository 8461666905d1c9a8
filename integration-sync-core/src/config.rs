use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::secret::SecretString;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_SERVER_URL: &str = "INTEGRATION_SYNC_SERVER_URL";
pub const ENV_API_KEY: &str = "INTEGRATION_SYNC_API_KEY";
pub const ENV_ACCOUNT_ID: &str = "INTEGRATION_SYNC_ACCOUNT_ID";
pub const ENV_TIMEOUT_SECS: &str = "INTEGRATION_SYNC_TIMEOUT_SECS";

/// Connection parameters, supplied once when the registry is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub server_url: String,
    pub api_key: SecretString,
    pub account_id: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderConfig {
    pub fn new(server_url: impl Into<String>, api_key: SecretString, account_id: i64) -> Self {
        Self {
            server_url: server_url.into(),
            api_key,
            account_id,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Reads the connection parameters from `INTEGRATION_SYNC_*` variables.
    pub fn from_env() -> Result<Self> {
        let server_url = required_env(ENV_SERVER_URL)?;
        let api_key = SecretString::new(required_env(ENV_API_KEY)?);
        let raw_account = required_env(ENV_ACCOUNT_ID)?;
        let account_id = raw_account.trim().parse::<i64>().map_err(|e| {
            error!(error = %e, raw = %raw_account, "Failed to parse account id from env");
            Error::InputValidation(format!("{ENV_ACCOUNT_ID} must be an integer: {e}"))
        })?;
        let timeout_secs = match std::env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                Error::InputValidation(format!("{ENV_TIMEOUT_SECS} must be an integer: {e}"))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            server_url,
            api_key,
            account_id,
            timeout_secs,
        };
        config.validate()?;
        config.trace_loaded();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::InputValidation("server_url must not be empty".to_string()));
        }
        reqwest::Url::parse(&self.server_url).map_err(|e| {
            Error::InputValidation(format!("server_url {:?} is not a valid URL: {e}", self.server_url))
        })?;
        if self.api_key.is_empty() {
            return Err(Error::InputValidation("api_key must not be empty".to_string()));
        }
        if self.account_id <= 0 {
            return Err(Error::InputValidation(format!(
                "account_id must be positive, got {}",
                self.account_id
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InputValidation("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            server_url = %self.server_url,
            account_id = self.account_id,
            api_key_set = !self.api_key.is_empty(),
            timeout_secs = self.timeout_secs,
            "Loaded provider config"
        );
        debug!(?self, "Provider config loaded (full debug)");
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|e| {
        error!(error = ?e, var = name, "Required environment variable missing");
        Error::InputValidation(format!("{name} environment variable not set: {e}"))
    })
}
