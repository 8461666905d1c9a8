//! # lifecycle: create / read / update / delete / import for one kind
//!
//! [`Controller`] is generic over the kind's configuration type and owns
//! nothing but its [`Contract`] and a handle on the shared [`Transport`]. Every
//! remote call goes through the transport's slot pool and honours the caller's
//! [`CancellationToken`].
//!
//! Operations never mutate caller state: they return a new
//! [`IntegrationState`] only after the service confirmed the change, so a
//! failed call leaves whatever the caller persisted untouched.
//!
//! [`Reconciler`] is the same lifecycle with JSON in and out, so callers that
//! only know a kind tag at runtime (the registry, the CLI) can dispatch to it.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::blocks::{schedule_to_remote, InvalidationStrategy, Schedule};
use crate::contract::{Contract, TriggerStyle};
use crate::error::{Error, Result};
use crate::kinds::KindConfiguration;
use crate::model::{ImportedIntegration, IntegrationSpec, IntegrationState, ResourceState, ServerFields};
use crate::remote::{IntegrationId, IntegrationIn, IntegrationOut};
use crate::transport::Transport;

pub struct Controller<C> {
    contract: Arc<Contract<C>>,
    transport: Arc<Transport>,
}

impl<C> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            contract: Arc::clone(&self.contract),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<C: KindConfiguration> Controller<C> {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self {
            contract: Arc::new(C::contract()),
            transport,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.contract.kind()
    }

    pub async fn create(
        &self,
        cancel: &CancellationToken,
        spec: &IntegrationSpec<C>,
    ) -> Result<IntegrationState<C>> {
        let kind = self.kind();
        let body = self.to_request(spec)?;
        info!(kind, name = %spec.name, "Creating integration");

        let out = self
            .transport
            .create_integration(cancel, &body)
            .await
            .map_err(|e| {
                error!(kind, error = %e, "Failed to create integration");
                e
            })?;
        let state = self.absorb(out, Some(spec))?;
        info!(kind, integration_id = %state.id, "Created integration");
        Ok(state)
    }

    /// Refreshes `current` from the service. A vanished instance surfaces as
    /// [`Error::NotFound`]; deciding to drop or recreate it is the caller's call.
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        current: &ResourceState<C>,
    ) -> Result<IntegrationState<C>> {
        let kind = self.kind();
        let id = current.id();
        debug!(kind, integration_id = %id, "Reading integration");

        let out = match self.transport.get_integration(cancel, id).await {
            Ok(out) => out,
            Err(e) if e.is_not_found() => {
                warn!(kind, integration_id = %id, "Integration no longer exists remotely");
                return Err(e);
            }
            Err(e) => {
                error!(kind, integration_id = %id, error = %e, "Failed to read integration");
                return Err(e);
            }
        };
        if out.id != id {
            return Err(Error::Decode(format!(
                "asked for integration {id}, service answered with {}",
                out.id
            )));
        }
        let prior = current.managed().map(|state| &state.spec);
        let state = self.absorb(out, prior)?;
        info!(kind, integration_id = %id, "Read integration");
        Ok(state)
    }

    /// Re-derives everything but identity from `spec`. A vanished instance is
    /// [`Error::UpdateTargetMissing`], never a silent success.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        id: IntegrationId,
        spec: &IntegrationSpec<C>,
    ) -> Result<IntegrationState<C>> {
        let kind = self.kind();
        let body = self.to_request(spec)?;
        info!(kind, integration_id = %id, "Updating integration");

        let out = match self.transport.update_integration(cancel, id, &body).await {
            Ok(out) => out,
            Err(e) if e.is_not_found() => {
                error!(kind, integration_id = %id, "Integration vanished before update");
                return Err(Error::UpdateTargetMissing { id });
            }
            Err(e) => {
                error!(kind, integration_id = %id, error = %e, "Failed to update integration");
                return Err(e);
            }
        };
        if out.id != id {
            error!(kind, integration_id = %id, found = %out.id, "Update answered for another integration");
            return Err(Error::Decode(format!(
                "updated integration {id}, service answered with {}",
                out.id
            )));
        }
        let state = self.absorb(out, Some(spec))?;
        info!(kind, integration_id = %id, "Updated integration");
        Ok(state)
    }

    /// Idempotent: an instance that is already gone counts as deleted.
    pub async fn delete(&self, cancel: &CancellationToken, id: IntegrationId) -> Result<()> {
        let kind = self.kind();
        info!(kind, integration_id = %id, "Deleting integration");
        match self.transport.delete_integration(cancel, id).await {
            Ok(()) => {
                info!(kind, integration_id = %id, "Deleted integration");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(kind, integration_id = %id, "Integration already absent, nothing to delete");
                Ok(())
            }
            Err(e) => {
                error!(kind, integration_id = %id, error = %e, "Failed to delete integration");
                Err(e)
            }
        }
    }

    /// Accepts a numeric identity and returns a state that must be read before use.
    pub fn import(&self, raw_id: &str) -> Result<ResourceState<C>> {
        let id: IntegrationId = raw_id.parse()?;
        info!(kind = self.kind(), integration_id = %id, "Imported integration identity");
        Ok(ResourceState::Imported(ImportedIntegration { id }))
    }

    fn to_request(&self, spec: &IntegrationSpec<C>) -> Result<IntegrationIn> {
        let kind = self.kind();
        if spec.name.trim().is_empty() {
            return Err(Error::InputValidation(format!("{kind}: name is required")));
        }
        let configuration = self.contract.to_remote(&spec.configuration)?;
        let schedule = match self.contract.trigger() {
            TriggerStyle::Pull => schedule_to_remote(spec.schedule.as_ref())?,
            TriggerStyle::Push => {
                if spec.schedule.is_some() {
                    warn!(kind, "Ignoring schedule on a push integration");
                }
                None
            }
        };
        debug!(
            kind,
            fields = ?self.contract.present_keys(&spec.configuration),
            scheduled = schedule.is_some(),
            "Built integration request"
        );

        Ok(IntegrationIn {
            integration_type: kind.to_string(),
            name: spec.name.clone(),
            active: spec.active,
            schedule,
            configuration,
            invalidation_strategy: spec
                .invalidation_strategy
                .as_ref()
                .map(InvalidationStrategy::to_remote),
            pending_credentials_lookup_key: spec.pending_credentials_lookup_key.clone(),
        })
    }

    /// Turns a confirmed response into state. `desired` supplies the values
    /// the service does not echo back (redacted credentials, lookup key).
    fn absorb(
        &self,
        out: IntegrationOut,
        desired: Option<&IntegrationSpec<C>>,
    ) -> Result<IntegrationState<C>> {
        let kind = self.kind();
        if out.integration_type != kind {
            error!(
                expected = kind,
                found = %out.integration_type,
                integration_id = %out.id,
                "Service reports a different integration kind"
            );
            return Err(Error::KindMismatch {
                expected: kind.to_string(),
                found: out.integration_type,
            });
        }

        let server = ServerFields::from_remote(&out);
        let configuration = self.contract.merge_remote(
            &out.configuration.unwrap_or_default(),
            desired.map(|d| &d.configuration),
        );
        // Push kinds never look at whatever schedule the service sends.
        let schedule = if self.contract.trigger().allows_schedule() {
            out.schedule.as_ref().and_then(Schedule::from_remote)
        } else {
            None
        };

        Ok(IntegrationState {
            id: out.id,
            kind: kind.to_string(),
            spec: IntegrationSpec {
                name: out.name,
                active: out.active.or_else(|| desired.and_then(|d| d.active)),
                schedule,
                invalidation_strategy: out
                    .invalidation_strategy
                    .as_ref()
                    .and_then(InvalidationStrategy::from_remote),
                pending_credentials_lookup_key: out
                    .pending_credentials_lookup_key
                    .or_else(|| desired.and_then(|d| d.pending_credentials_lookup_key.clone())),
                configuration,
            },
            server,
        })
    }
}

/// Kind-erased lifecycle: desired specs and states travel as JSON.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Reconciler: Send + Sync {
    fn kind(&self) -> &'static str;

    fn trigger(&self) -> TriggerStyle;

    /// `desired` is an [`IntegrationSpec`]; returns an [`IntegrationState`].
    async fn create(&self, cancel: &CancellationToken, desired: Value) -> Result<Value>;

    /// `current` is a [`ResourceState`]; returns an [`IntegrationState`].
    async fn read(&self, cancel: &CancellationToken, current: Value) -> Result<Value>;

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: IntegrationId,
        desired: Value,
    ) -> Result<Value>;

    async fn delete(&self, cancel: &CancellationToken, id: IntegrationId) -> Result<()>;

    /// Returns a [`ResourceState::Imported`].
    fn import(&self, raw_id: &str) -> Result<Value>;
}

fn parse<T: serde::de::DeserializeOwned>(kind: &str, what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::InputValidation(format!("{kind}: invalid {what}: {e}")))
}

fn render<T: serde::Serialize>(kind: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::Decode(format!("{kind}: failed to encode state: {e}")))
}

#[async_trait]
impl<C: KindConfiguration> Reconciler for Controller<C> {
    fn kind(&self) -> &'static str {
        self.contract.kind()
    }

    fn trigger(&self) -> TriggerStyle {
        self.contract.trigger()
    }

    async fn create(&self, cancel: &CancellationToken, desired: Value) -> Result<Value> {
        let spec: IntegrationSpec<C> = parse(C::KIND, "desired spec", desired)?;
        let state = Controller::create(self, cancel, &spec).await?;
        render(C::KIND, &ResourceState::Managed(state))
    }

    async fn read(&self, cancel: &CancellationToken, current: Value) -> Result<Value> {
        let current: ResourceState<C> = parse(C::KIND, "state", current)?;
        let state = Controller::read(self, cancel, &current).await?;
        render(C::KIND, &ResourceState::Managed(state))
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: IntegrationId,
        desired: Value,
    ) -> Result<Value> {
        let spec: IntegrationSpec<C> = parse(C::KIND, "desired spec", desired)?;
        let state = Controller::update(self, cancel, id, &spec).await?;
        render(C::KIND, &ResourceState::Managed(state))
    }

    async fn delete(&self, cancel: &CancellationToken, id: IntegrationId) -> Result<()> {
        Controller::delete(self, cancel, id).await
    }

    fn import(&self, raw_id: &str) -> Result<Value> {
        let state = Controller::import(self, raw_id)?;
        render(C::KIND, &state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{DbtCoreConfiguration, FivetranConfiguration, HexConfiguration};
    use crate::secret::SecretString;
    use crate::transport::{ApiResponse, MockExchange};
    use reqwest::Method;
    use serde_json::json;

    fn controller<C: KindConfiguration>(mock: MockExchange) -> Controller<C> {
        Controller::new(Arc::new(Transport::new(Arc::new(mock), 5)))
    }

    fn fivetran_spec() -> IntegrationSpec<FivetranConfiguration> {
        IntegrationSpec::new(
            "fivetran",
            FivetranConfiguration {
                api_key: Some(SecretString::new("k")),
                api_secret: Some(SecretString::new("s")),
                base_url: None,
            },
        )
    }

    fn ok(body: Value) -> Result<ApiResponse> {
        Ok(ApiResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn update_of_vanished_instance_is_distinct_from_not_found() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .withf(|req| req.method == Method::PATCH && req.path == "/accounts/5/integrations/8")
            .returning(|_| {
                Ok(ApiResponse {
                    status: 404,
                    body: String::new(),
                })
            });

        let err = controller::<FivetranConfiguration>(mock)
            .update(&CancellationToken::new(), IntegrationId::new(8), &fivetran_spec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpdateTargetMissing { id } if id.get() == 8));
    }

    #[tokio::test]
    async fn delete_treats_not_found_as_success() {
        let mut mock = MockExchange::new();
        mock.expect_send().times(1).returning(|_| {
            Ok(ApiResponse {
                status: 404,
                body: "gone".to_string(),
            })
        });

        controller::<FivetranConfiguration>(mock)
            .delete(&CancellationToken::new(), IntegrationId::new(8))
            .await
            .expect("delete of missing instance should succeed");
    }

    #[tokio::test]
    async fn read_rejects_instance_of_another_kind() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .returning(|_| ok(json!({ "id": 2, "integration_type": "hex", "name": "x" })));

        let current = ResourceState::Imported(ImportedIntegration {
            id: IntegrationId::new(2),
        });
        let err = controller::<FivetranConfiguration>(mock)
            .read(&CancellationToken::new(), &current)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KindMismatch { ref found, .. } if found == "hex"));
    }

    #[tokio::test]
    async fn push_kind_never_sends_or_keeps_a_schedule() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .withf(|req| {
                req.method == Method::POST
                    && req.body.as_ref().is_some_and(|b| b.get("schedule").is_none())
            })
            .returning(|_| {
                ok(json!({
                    "id": 4,
                    "integration_type": "dbt_core",
                    "name": "models",
                    "active": true,
                    "configuration": { "build_target": "prod" },
                    "schedule": { "time_zone": "UTC", "repeat_period": 1 },
                    "trigger_secret": "ts",
                    "trigger_url": "https://hooks.example.com/4"
                }))
            });

        let mut spec = IntegrationSpec::new(
            "models",
            DbtCoreConfiguration {
                build_target: Some("prod".to_string()),
                ..DbtCoreConfiguration::default()
            },
        );
        spec.schedule = Some(Schedule {
            time_zone: "UTC".to_string(),
            ..Schedule::default()
        });

        let state = controller::<DbtCoreConfiguration>(mock)
            .create(&CancellationToken::new(), &spec)
            .await
            .unwrap();
        assert!(state.spec.schedule.is_none());
        assert_eq!(state.server.trigger_secret.unwrap().expose(), "ts");
    }

    #[tokio::test]
    async fn push_kind_ignores_malformed_schedule_in_response() {
        let mut mock = MockExchange::new();
        mock.expect_send().times(1).returning(|_| {
            ok(json!({
                "id": 6,
                "integration_type": "dbt_core",
                "name": "models",
                "configuration": {},
                "schedule": { "repeat_period": 6 },
                "trigger_secret": "ts",
                "trigger_url": "https://hooks.example.com/6"
            }))
        });

        let spec = IntegrationSpec::new(
            "models",
            DbtCoreConfiguration {
                build_target: Some("prod".to_string()),
                ..DbtCoreConfiguration::default()
            },
        );
        let state = controller::<DbtCoreConfiguration>(mock)
            .create(&CancellationToken::new(), &spec)
            .await
            .expect("a malformed schedule must not fail a push create");
        assert_eq!(state.id, IntegrationId::new(6));
        assert!(state.spec.schedule.is_none());
    }

    #[tokio::test]
    async fn pull_read_skips_mistyped_schedule_field() {
        let mut mock = MockExchange::new();
        mock.expect_send().times(1).returning(|_| {
            ok(json!({
                "id": 3,
                "integration_type": "hex",
                "name": "bi",
                "configuration": { "workspace_id": "ws" },
                "schedule": { "time_zone": "UTC", "repeat_time": "10:00:00", "repeat_period": "6" },
                "invalidation_strategy": { "ttl_days": 7, "revision_id": "r1" }
            }))
        });

        let current = ResourceState::Imported(ImportedIntegration {
            id: IntegrationId::new(3),
        });
        let state = controller::<HexConfiguration>(mock)
            .read(&CancellationToken::new(), &current)
            .await
            .expect("a mistyped schedule field must not fail the read");
        let schedule = state.spec.schedule.expect("time zone was valid");
        assert_eq!(schedule.time_zone, "UTC");
        assert_eq!(schedule.repeat_time.as_deref(), Some("10:00:00"));
        assert_eq!(schedule.repeat_period, None);
        assert_eq!(
            state.spec.invalidation_strategy,
            Some(InvalidationStrategy {
                ttl_days: 7,
                revision_id: None,
            })
        );
    }

    #[tokio::test]
    async fn update_rejects_answer_for_another_identity() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .withf(|req| req.method == Method::PATCH && req.path == "/accounts/5/integrations/8")
            .times(1)
            .returning(|_| ok(json!({ "id": 9, "integration_type": "fivetran", "name": "fivetran" })));

        let err = controller::<FivetranConfiguration>(mock)
            .update(&CancellationToken::new(), IntegrationId::new(8), &fivetran_spec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(ref m) if m.contains('8') && m.contains('9')));
    }

    #[tokio::test]
    async fn server_default_for_active_is_kept_and_caller_value_survives_omission() {
        let mut mock = MockExchange::new();
        mock.expect_send().returning(|_| {
            ok(json!({
                "id": 9,
                "integration_type": "fivetran",
                "name": "fivetran",
                "configuration": { "base_url": "https://api.fivetran.com" }
            }))
        });

        let mut spec = fivetran_spec();
        spec.active = Some(false);
        spec.pending_credentials_lookup_key = Some("lookup-1".to_string());
        let state = controller::<FivetranConfiguration>(mock)
            .create(&CancellationToken::new(), &spec)
            .await
            .unwrap();
        assert_eq!(state.spec.active, Some(false));
        assert_eq!(state.spec.pending_credentials_lookup_key.as_deref(), Some("lookup-1"));
        assert_eq!(
            state.spec.configuration.api_secret.as_ref().map(SecretString::expose),
            Some("s")
        );
        assert_eq!(
            state.spec.configuration.base_url.as_deref(),
            Some("https://api.fivetran.com")
        );
    }

    #[test]
    fn import_accepts_digits_only() {
        let controller = controller::<FivetranConfiguration>(MockExchange::new());
        let state = controller.import("123").unwrap();
        assert_eq!(state.id(), IntegrationId::new(123));
        assert!(matches!(controller.import("abc"), Err(Error::InputValidation(_))));
    }

    #[tokio::test]
    async fn erased_create_rejects_malformed_desired_state_before_any_call() {
        let mut mock = MockExchange::new();
        mock.expect_send().never();
        let reconciler: Arc<dyn Reconciler> = Arc::new(controller::<FivetranConfiguration>(mock));

        let err = reconciler
            .create(&CancellationToken::new(), json!({ "name": "f", "configuration": { "api_key": 3 } }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputValidation(_)));
    }
}
