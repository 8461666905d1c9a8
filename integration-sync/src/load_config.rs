//! `load_config`: parses the declared integrations file and adapts it to core types.
//!
//! The YAML file holds the connection parameters and the desired state of each
//! resource, keyed by a caller-chosen address. Secrets stay out of the file:
//! the API key is injected from `INTEGRATION_SYNC_API_KEY`. Credential fields
//! inside a resource's `configuration` may be written inline or, preferably, as
//! `${ENV_VAR}` references that are resolved at load time.
//!
//! ```yaml
//! connection:
//!   server_url: https://api.example.com
//!   account_id: 1234
//! resources:
//!   - address: warehouse
//!     kind: snowflake
//!     name: Snowflake
//!     configuration:
//!       host: acme.snowflakecomputing.com
//!       user: EUNO
//!       password: ${SNOWFLAKE_PASSWORD}
//! ```

use anyhow::{anyhow, bail, Context, Result};
use integration_sync_core::config::{ProviderConfig, DEFAULT_TIMEOUT_SECS, ENV_API_KEY};
use integration_sync_core::registry::kind_info;
use integration_sync_core::secret::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    pub server_url: String,
    pub account_id: i64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// One declared resource. Everything besides `address` and `kind` is the
/// desired integration spec and is validated by the kind's controller.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub address: String,
    pub kind: String,
    #[serde(flatten)]
    pub spec: Map<String, Value>,
}

impl ResourceEntry {
    pub fn desired(&self) -> Value {
        Value::Object(self.spec.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub connection: ConnectionSection,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

impl CliConfig {
    /// Connection parameters with the API key injected from the environment.
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let api_key = std::env::var(ENV_API_KEY).map_err(|e| {
            error!(var = ENV_API_KEY, "API key environment variable missing");
            anyhow!("{ENV_API_KEY} environment variable not set: {e}")
        })?;
        let config = ProviderConfig {
            server_url: self.connection.server_url.clone(),
            api_key: SecretString::new(api_key),
            account_id: self.connection.account_id,
            timeout_secs: self.connection.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        config.validate().context("invalid connection settings")?;
        Ok(config)
    }

    pub fn resource(&self, address: &str) -> Result<&ResourceEntry> {
        self.resources
            .iter()
            .find(|r| r.address == address)
            .ok_or_else(|| anyhow!("no resource with address `{address}` in config"))
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let mut config: CliConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = %e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML: {e}")
    })?;

    let mut seen = BTreeSet::new();
    for resource in &mut config.resources {
        if resource.address.trim().is_empty() {
            bail!("resource address must not be empty");
        }
        if !seen.insert(resource.address.clone()) {
            bail!("duplicate resource address `{}`", resource.address);
        }
        if kind_info(&resource.kind).is_none() {
            bail!(
                "resource `{}` has unknown kind `{}`",
                resource.address,
                resource.kind
            );
        }
        if let Some(Value::Object(configuration)) = resource.spec.get_mut("configuration") {
            for (key, value) in configuration.iter_mut() {
                resolve_env_reference(&resource.address, key, value)?;
            }
        }
    }

    info!(
        config_path = ?path_ref,
        resources = config.resources.len(),
        account_id = config.connection.account_id,
        "Parsed config YAML successfully"
    );
    Ok(config)
}

/// Replaces a whole-string `${VAR}` value with the variable's contents.
fn resolve_env_reference(address: &str, key: &str, value: &mut Value) -> Result<()> {
    let Value::String(raw) = value else {
        return Ok(());
    };
    let Some(var) = raw.strip_prefix("${").and_then(|r| r.strip_suffix('}')) else {
        return Ok(());
    };
    let resolved = std::env::var(var).map_err(|_| {
        error!(address, key, var, "Referenced environment variable missing");
        anyhow!("resource `{address}`: configuration.{key} references unset environment variable {var}")
    })?;
    *value = Value::String(resolved);
    Ok(())
}
