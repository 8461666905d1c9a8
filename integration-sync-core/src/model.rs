//! # model: typed desired and observed state of one integration instance
//!
//! - [`IntegrationSpec`]: what the caller declares (name, active flag, blocks,
//!   per-kind configuration).
//! - [`ServerFields`]: values only the remote service computes. Never sent.
//! - [`IntegrationState`]: identity + kind + spec + server fields, as persisted
//!   after a confirmed create/read/update.
//! - [`ResourceState`]: either a fully read [`IntegrationState`] or an
//!   identity-only [`ImportedIntegration`] that must be read before use.

use serde::{Deserialize, Serialize};

use crate::blocks::{InvalidationStrategy, Schedule};
use crate::remote::{IntegrationId, IntegrationOut};
use crate::secret::SecretString;

/// Caller-owned desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationSpec<C> {
    pub name: String,
    /// `None` leaves the choice to the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidation_strategy: Option<InvalidationStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_credentials_lookup_key: Option<String>,
    pub configuration: C,
}

impl<C> IntegrationSpec<C> {
    pub fn new(name: impl Into<String>, configuration: C) -> Self {
        Self {
            name: name.into(),
            active: None,
            schedule: None,
            invalidation_strategy: None,
            pending_credentials_lookup_key: None,
            configuration,
        }
    }
}

/// Server-computed values; round-tripped into the persisted state, never sent back.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_secret: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_url: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_run_end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_triggered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_integration_data: Option<serde_json::Value>,
}

impl ServerFields {
    pub(crate) fn from_remote(out: &IntegrationOut) -> Self {
        Self {
            account_id: out.account_id,
            created_at: out.created_at.clone(),
            created_by: out.created_by.clone(),
            last_updated_at: out.last_updated_at.clone(),
            last_updated_by: out.last_updated_by.clone(),
            trigger_type: out.trigger_type.clone(),
            trigger_secret: out.trigger_secret.clone(),
            trigger_url: out.trigger_url.clone(),
            last_run_status: out.last_run_status.clone(),
            last_completed_run_end_time: out.last_completed_run_end_time.clone(),
            last_time_triggered: out.last_time_triggered.clone(),
            health: out.health.clone(),
            collected_integration_data: out.collected_integration_data.clone(),
        }
    }
}

/// Observed state after a confirmed remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationState<C> {
    pub id: IntegrationId,
    pub kind: String,
    pub spec: IntegrationSpec<C>,
    #[serde(default)]
    pub server: ServerFields,
}

/// An identity supplied by the caller, not yet read from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedIntegration {
    pub id: IntegrationId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResourceState<C> {
    Imported(ImportedIntegration),
    Managed(IntegrationState<C>),
}

impl<C> ResourceState<C> {
    pub fn id(&self) -> IntegrationId {
        match self {
            ResourceState::Imported(imported) => imported.id,
            ResourceState::Managed(state) => state.id,
        }
    }

    pub fn managed(&self) -> Option<&IntegrationState<C>> {
        match self {
            ResourceState::Managed(state) => Some(state),
            ResourceState::Imported(_) => None,
        }
    }
}
