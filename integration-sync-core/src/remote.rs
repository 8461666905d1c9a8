//! # remote: wire schema of an integration on the remote service
//!
//! [`IntegrationIn`] is what the lifecycle controllers send on create and
//! update; [`IntegrationOut`] is what the service answers with. The
//! per-kind `configuration` object is carried untyped here and interpreted by
//! the kind's [`Contract`](crate::contract::Contract).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::secret::SecretString;

/// Free-form, kind-specific configuration object.
pub type ConfigurationMap = serde_json::Map<String, serde_json::Value>;

/// Server-assigned identity of one integration instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationId(i64);

impl IntegrationId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for IntegrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IntegrationId {
    type Err = Error;

    /// Accepts ASCII digits only (surrounding whitespace is trimmed) denoting a positive id.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InputValidation(
                "integration id must not be empty".to_string(),
            ));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InputValidation(format!(
                "integration id {trimmed:?} must be numeric"
            )));
        }
        let id = trimmed.parse::<i64>().map_err(|e| {
            Error::InputValidation(format!("integration id {trimmed:?} is out of range: {e}"))
        })?;
        if id == 0 {
            return Err(Error::InputValidation(
                "integration id must be positive".to_string(),
            ));
        }
        Ok(Self(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteSchedule {
    pub time_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_on: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_period: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteInvalidationStrategy {
    pub ttl_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<i64>,
}

/// Request body for create (POST) and update (PATCH).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationIn {
    pub integration_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<RemoteSchedule>,
    pub configuration: ConfigurationMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation_strategy: Option<RemoteInvalidationStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_credentials_lookup_key: Option<String>,
}

/// Response body for create, read and update.
///
/// The nested schedule and invalidation blocks stay untyped: they are decoded
/// field by field in [`blocks`](crate::blocks), so a malformed block never
/// fails the whole response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntegrationOut {
    pub id: IntegrationId,
    pub integration_type: String,
    pub name: String,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub configuration: Option<ConfigurationMap>,
    #[serde(default)]
    pub schedule: Option<serde_json::Value>,
    #[serde(default)]
    pub invalidation_strategy: Option<serde_json::Value>,
    #[serde(default)]
    pub pending_credentials_lookup_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub last_updated_at: Option<String>,
    #[serde(default)]
    pub last_updated_by: Option<String>,
    #[serde(default)]
    pub trigger_type: Option<String>,
    #[serde(default)]
    pub trigger_secret: Option<SecretString>,
    #[serde(default)]
    pub trigger_url: Option<SecretString>,
    #[serde(default)]
    pub last_run_status: Option<String>,
    #[serde(default)]
    pub last_completed_run_end_time: Option<String>,
    #[serde(default)]
    pub last_time_triggered: Option<String>,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub collected_integration_data: Option<serde_json::Value>,
}
