//! # transport: bounded-concurrency gateway to the remote integrations API
//!
//! All outbound calls go through one [`Transport`]. It admits at most
//! [`MAX_IN_FLIGHT`] exchanges at a time no matter how many callers are
//! waiting, honours the caller's [`CancellationToken`] both while queued and
//! while the request is in flight, and classifies status codes:
//!
//! - any 2xx: returned as an [`ApiResponse`]
//! - 404: [`Error::NotFound`]
//! - everything else: [`Error::RemoteFailure`] with the body verbatim
//!
//! The HTTP exchange itself sits behind the [`Exchange`] trait so tests can
//! swap in counting or scripted backends. [`ReqwestExchange`] is the production
//! implementation (bearer auth, fixed timeout, rustls).
//!
//! The slot pool is a concurrency cap only. Two concurrent operations on the
//! same integration id are not serialized here; callers that need that must
//! order them themselves.

use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::remote::{IntegrationId, IntegrationIn, IntegrationOut};
use crate::secret::SecretString;

/// Hard ceiling on concurrent in-flight exchanges, shared by every controller.
pub const MAX_IN_FLIGHT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the configured base URL, starting with `/`.
    pub path: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// One raw HTTP exchange: connect, send, await the response and read its body.
///
/// Implementations report transport-level failures as [`Error::Connectivity`]
/// and return every status code unclassified.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

pub struct ReqwestExchange {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl ReqwestExchange {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client");
                Error::Connectivity(format!("failed to build HTTP client: {e}"))
            })?;
        info!(
            server_url = %config.server_url,
            api_key_set = !config.api_key.is_empty(),
            timeout_secs = config.timeout_secs,
            "Initialized HTTP exchange"
        );
        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Exchange for ReqwestExchange {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method, &url)
            .bearer_auth(self.api_key.expose());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Connectivity(format!("request to {url} failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Connectivity(format!("failed to read response body: {e}")))?;
        Ok(ApiResponse { status, body })
    }
}

/// Rate-limited, account-scoped client for the integrations API.
pub struct Transport {
    exchange: Arc<dyn Exchange>,
    slots: Semaphore,
    account_id: i64,
}

impl Transport {
    pub fn new(exchange: Arc<dyn Exchange>, account_id: i64) -> Self {
        Self {
            exchange,
            slots: Semaphore::new(MAX_IN_FLIGHT),
            account_id,
        }
    }

    /// Validates `config` and builds a transport over a real HTTP client.
    pub fn connect(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let exchange = ReqwestExchange::new(config)?;
        Ok(Self::new(Arc::new(exchange), config.account_id))
    }

    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    /// Slots not currently held by an in-flight exchange.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Runs one exchange under a concurrency slot.
    ///
    /// Cancellation while queued returns [`Error::Cancelled`] without touching
    /// the network; cancellation while in flight drops the exchange future.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let _slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%method, path = %path, "Cancelled while waiting for a transport slot");
                return Err(Error::Cancelled);
            }
            permit = self.slots.acquire() => permit
                .map_err(|_| Error::Connectivity("transport slot pool is closed".to_string()))?,
        };
        debug!(
            %method,
            path = %path,
            available = self.slots.available_permits(),
            "Transport slot acquired"
        );

        let request = ApiRequest {
            method: method.clone(),
            path: path.clone(),
            body,
        };
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(%method, path = %path, "Cancelled while request was in flight");
                return Err(Error::Cancelled);
            }
            response = self.exchange.send(request) => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!(%method, path = %path, error = %e, "Exchange failed");
                return Err(e);
            }
        };
        debug!(%method, path = %path, status = response.status, "Exchange completed");

        match response.status {
            200..=299 => Ok(response),
            404 => Err(Error::NotFound { resource: path }),
            status => {
                error!(%method, path = %path, status, "Remote service rejected request");
                Err(Error::RemoteFailure {
                    status,
                    body: response.body,
                })
            }
        }
    }

    fn integrations_path(&self) -> String {
        format!("/accounts/{}/integrations", self.account_id)
    }

    fn integration_path(&self, id: IntegrationId) -> String {
        format!("/accounts/{}/integrations/{}", self.account_id, id)
    }

    pub async fn create_integration(
        &self,
        cancel: &CancellationToken,
        body: &IntegrationIn,
    ) -> Result<IntegrationOut> {
        let payload = encode(body)?;
        let response = self
            .execute(cancel, Method::POST, self.integrations_path(), Some(payload))
            .await?;
        decode(&response)
    }

    pub async fn get_integration(
        &self,
        cancel: &CancellationToken,
        id: IntegrationId,
    ) -> Result<IntegrationOut> {
        let response = self
            .execute(cancel, Method::GET, self.integration_path(id), None)
            .await?;
        decode(&response)
    }

    pub async fn update_integration(
        &self,
        cancel: &CancellationToken,
        id: IntegrationId,
        body: &IntegrationIn,
    ) -> Result<IntegrationOut> {
        let payload = encode(body)?;
        let response = self
            .execute(cancel, Method::PATCH, self.integration_path(id), Some(payload))
            .await?;
        decode(&response)
    }

    pub async fn delete_integration(
        &self,
        cancel: &CancellationToken,
        id: IntegrationId,
    ) -> Result<()> {
        self.execute(cancel, Method::DELETE, self.integration_path(id), None)
            .await
            .map(|_| ())
    }
}

fn encode(body: &IntegrationIn) -> Result<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| Error::InputValidation(format!("failed to encode integration: {e}")))
}

fn decode(response: &ApiResponse) -> Result<IntegrationOut> {
    let out: IntegrationOut = serde_json::from_str(&response.body)
        .map_err(|e| Error::Decode(format!("integration response: {e}")))?;
    if out.id.get() <= 0 {
        return Err(Error::Decode(format!(
            "integration response carried invalid identity {}",
            out.id
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    fn transport_with(mock: MockExchange) -> Transport {
        Transport::new(Arc::new(mock), 12)
    }

    #[tokio::test]
    async fn builds_account_scoped_paths() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .withf(|req| req.method == Method::GET && req.path == "/accounts/12/integrations/5")
            .times(1)
            .returning(|_| {
                Ok(ApiResponse {
                    status: 200,
                    body: r#"{"id":5,"integration_type":"hex","name":"h"}"#.to_string(),
                })
            });

        let transport = transport_with(mock);
        let out = transport
            .get_integration(&CancellationToken::new(), IntegrationId::new(5))
            .await
            .unwrap();
        assert_eq!(out.id, IntegrationId::new(5));
        assert_eq!(transport.available_slots(), MAX_IN_FLIGHT);
    }

    #[tokio::test]
    async fn classifies_404_as_not_found() {
        let mut mock = MockExchange::new();
        mock.expect_send().returning(|_| {
            Ok(ApiResponse {
                status: 404,
                body: "missing".to_string(),
            })
        });

        let err = transport_with(mock)
            .execute(
                &CancellationToken::new(),
                Method::GET,
                "/accounts/12/integrations/1".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref resource } if resource.ends_with("/1")));
    }

    #[tokio::test]
    async fn keeps_status_and_body_of_remote_failures() {
        for (code, raw) in [(422, r#"{"detail":"bad ttl"}"#), (500, "internal error")] {
            let mut mock = MockExchange::new();
            mock.expect_send().returning(move |_| {
                Ok(ApiResponse {
                    status: code,
                    body: raw.to_string(),
                })
            });

            let err = transport_with(mock)
                .execute(
                    &CancellationToken::new(),
                    Method::POST,
                    "/accounts/12/integrations".to_string(),
                    Some(serde_json::json!({})),
                )
                .await
                .unwrap_err();
            match err {
                Error::RemoteFailure { status, body } => {
                    assert_eq!(status, code);
                    assert_eq!(body, raw);
                }
                other => panic!("expected remote failure, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn releases_slot_after_connectivity_error() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .times(MAX_IN_FLIGHT + 1)
            .returning(|_| Err(Error::Connectivity("connection refused".to_string())));

        let transport = transport_with(mock);
        for _ in 0..=MAX_IN_FLIGHT {
            let err = transport
                .execute(&CancellationToken::new(), Method::DELETE, "/x".to_string(), None)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Connectivity(_)));
        }
        assert_eq!(transport.available_slots(), MAX_IN_FLIGHT);
    }

    #[tokio::test]
    async fn pre_cancelled_call_never_reaches_the_exchange() {
        let mut mock = MockExchange::new();
        mock.expect_send().never();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = transport_with(mock)
            .execute(&cancel, Method::GET, "/x".to_string(), None)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn rejects_success_body_that_is_not_an_integration() {
        let mut mock = MockExchange::new();
        mock.expect_send()
            .with(always())
            .returning(|_| {
                Ok(ApiResponse {
                    status: 201,
                    body: "<html>gateway</html>".to_string(),
                })
            });

        let err = transport_with(mock)
            .get_integration(&CancellationToken::new(), IntegrationId::new(3))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn no_content_completes_delete_but_not_read() {
        let mut mock = MockExchange::new();
        mock.expect_send().times(2).returning(|_| {
            Ok(ApiResponse {
                status: 204,
                body: String::new(),
            })
        });
        let transport = transport_with(mock);
        let cancel = CancellationToken::new();

        transport
            .delete_integration(&cancel, IntegrationId::new(3))
            .await
            .expect("204 completes a delete");
        let err = transport
            .get_integration(&cancel, IntegrationId::new(3))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
