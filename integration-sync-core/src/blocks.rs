//! Shared nested blocks: the run schedule and the invalidation policy.
//!
//! Both keep the same present/absent discipline as the per-kind field tables:
//! an inner `None` means "not configured", while `""`, `0` and `[]` are values
//! that round-trip as themselves. Responses are decoded field by field; a
//! mistyped optional field is skipped with a warning, and a block whose
//! mandatory field is missing or mistyped is dropped as a whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::contract::FieldValue;
use crate::error::{Error, Result};
use crate::remote::{RemoteInvalidationStrategy, RemoteSchedule};

/// When a pull integration is polled by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub time_zone: String,
    /// Weekday tokens, e.g. `["Mon", "Wed", "Fri"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_on: Option<Vec<String>>,
    /// Time of day, `HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_time: Option<String>,
    /// Hours between runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_period: Option<i64>,
}

/// Retention of the artifacts the remote service caches for an integration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvalidationStrategy {
    pub ttl_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<i64>,
}

impl Schedule {
    pub fn to_remote(&self) -> Result<RemoteSchedule> {
        if self.time_zone.trim().is_empty() {
            return Err(Error::InputValidation(
                "schedule.time_zone is required".to_string(),
            ));
        }
        Ok(RemoteSchedule {
            time_zone: self.time_zone.clone(),
            repeat_on: self.repeat_on.clone(),
            repeat_time: self.repeat_time.clone(),
            repeat_period: self.repeat_period,
        })
    }

    /// `None` when the service sent no usable schedule.
    pub fn from_remote(remote: &Value) -> Option<Self> {
        let block = RemoteBlock::open("schedule", remote)?;
        Some(Self {
            time_zone: block.mandatory("time_zone")?,
            repeat_on: block.optional("repeat_on"),
            repeat_time: block.optional("repeat_time"),
            repeat_period: block.optional("repeat_period"),
        })
    }
}

impl InvalidationStrategy {
    pub fn to_remote(&self) -> RemoteInvalidationStrategy {
        RemoteInvalidationStrategy {
            ttl_days: self.ttl_days,
            revision_id: self.revision_id,
        }
    }

    /// `None` when the service sent no usable policy.
    pub fn from_remote(remote: &Value) -> Option<Self> {
        let block = RemoteBlock::open("invalidation_strategy", remote)?;
        Some(Self {
            ttl_days: block.mandatory("ttl_days")?,
            revision_id: block.optional("revision_id"),
        })
    }
}

pub(crate) fn schedule_to_remote(schedule: Option<&Schedule>) -> Result<Option<RemoteSchedule>> {
    schedule.map(Schedule::to_remote).transpose()
}

/// One nested object of a response, read key by key.
struct RemoteBlock<'a> {
    name: &'static str,
    fields: &'a serde_json::Map<String, Value>,
}

impl<'a> RemoteBlock<'a> {
    fn open(name: &'static str, remote: &'a Value) -> Option<Self> {
        match remote {
            Value::Null => None,
            Value::Object(fields) => Some(Self { name, fields }),
            _ => {
                warn!(block = name, "Ignoring block that is not an object");
                None
            }
        }
    }

    /// Absent, null and mistyped all read as `None`; only a mistype is reported.
    fn optional<T: FieldValue>(&self, key: &'static str) -> Option<T> {
        match self.fields.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => {
                let decoded = T::from_json(value);
                if decoded.is_none() {
                    warn!(
                        block = self.name,
                        key,
                        expected = T::TYPE_NAME,
                        "Ignoring block field with unexpected type"
                    );
                }
                decoded
            }
        }
    }

    fn mandatory<T: FieldValue>(&self, key: &'static str) -> Option<T> {
        let value = self.optional(key);
        if value.is_none() {
            warn!(block = self.name, key, "Ignoring block without its mandatory field");
        }
        value
    }
}
