#![allow(dead_code)]

use async_trait::async_trait;
use integration_sync_core::error::Result;
use integration_sync_core::registry::Registry;
use integration_sync_core::transport::{ApiRequest, ApiResponse, Exchange, Transport};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ACCOUNT_ID: i64 = 42;

/// In-memory integrations service that counts calls and concurrent entries.
#[derive(Default)]
pub struct FakeBackend {
    store: Mutex<BTreeMap<i64, Value>>,
    next_id: AtomicUsize,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    latency: Option<Duration>,
    /// Configuration keys the service never echoes back (like real credential redaction).
    redacted: Vec<&'static str>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn redacting(mut self, keys: &[&'static str]) -> Self {
        self.redacted = keys.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn stored(&self, id: i64) -> Option<Value> {
        self.store.lock().unwrap().get(&id).cloned()
    }

    /// Edits a stored record in place, as an out-of-band change would.
    pub fn tamper(&self, id: i64, f: impl FnOnce(&mut Value)) {
        if let Some(record) = self.store.lock().unwrap().get_mut(&id) {
            f(record);
        }
    }

    pub fn remove(&self, id: i64) {
        self.store.lock().unwrap().remove(&id);
    }

    fn respond(&self, request: ApiRequest) -> ApiResponse {
        let prefix = format!("/accounts/{ACCOUNT_ID}/integrations");
        let Some(rest) = request.path.strip_prefix(&prefix) else {
            return status(404, "unknown account");
        };
        let id = match rest.strip_prefix('/') {
            None if rest.is_empty() => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => return status(404, "bad id"),
            },
            None => return status(404, "unknown path"),
        };

        let mut store = self.store.lock().unwrap();
        match (request.method, id) {
            (Method::POST, None) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                let mut record = request.body.unwrap_or_else(|| json!({}));
                record["id"] = json!(id);
                record["account_id"] = json!(ACCOUNT_ID);
                record["created_at"] = json!("2024-05-01T10:00:00Z");
                record["last_updated_at"] = json!("2024-05-01T10:00:00Z");
                if record["active"].is_null() {
                    record["active"] = json!(true);
                }
                if record["integration_type"] == "dbt_core" {
                    record["trigger_type"] = json!("push");
                    record["trigger_secret"] = json!(format!("trigger-secret-{id}"));
                    record["trigger_url"] = json!(format!("https://hooks.example.com/trigger/{id}"));
                }
                store.insert(id, record.clone());
                ok(201, self.redact(record))
            }
            (Method::GET, Some(id)) => match store.get(&id) {
                Some(record) => ok(200, self.redact(record.clone())),
                None => status(404, "Integration not found"),
            },
            (Method::PATCH, Some(id)) => match store.get_mut(&id) {
                Some(record) => {
                    if let Some(Value::Object(patch)) = request.body {
                        for (key, value) in patch {
                            record[key.as_str()] = value;
                        }
                    }
                    record["last_updated_at"] = json!("2024-05-02T10:00:00Z");
                    ok(200, self.redact(record.clone()))
                }
                None => status(404, "Integration not found"),
            },
            (Method::DELETE, Some(id)) => match store.remove(&id) {
                Some(_) => status(204, ""),
                None => status(404, "Integration not found"),
            },
            _ => status(405, "method not allowed"),
        }
    }

    fn redact(&self, mut record: Value) -> Value {
        if let Some(Value::Object(config)) = record.get_mut("configuration") {
            for key in &self.redacted {
                config.remove(*key);
            }
        }
        record
    }
}

fn ok(code: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status: code,
        body: body.to_string(),
    }
}

fn status(code: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status: code,
        body: body.to_string(),
    }
}

#[async_trait]
impl Exchange for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let response = self.respond(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

pub fn registry_over(backend: Arc<FakeBackend>) -> Registry {
    let transport = Transport::new(backend, ACCOUNT_ID);
    Registry::with_transport(Arc::new(transport))
}
