//! # contract: table-driven conversion between typed configuration and the wire map
//!
//! Each kind describes its configuration once, as a list of [`Field`]
//! descriptors (key, required/sensitive flags, and a pair of accessors onto an
//! `Option<T>` in the typed struct). [`Contract`] then provides both
//! directions generically:
//!
//! - [`Contract::to_remote`]: present fields are emitted in their JSON form,
//!   absent ones are left out, missing required ones are an input error.
//! - [`Contract::from_remote`]: recognised keys with the expected JSON type
//!   become present; absent, unknown or mistyped keys leave the field absent.
//!
//! Absent (`None`), explicitly empty (`Some("")`, `Some(0)`) and present are
//! kept distinct in both directions; no default is ever filled in here.
//!
//! Mistyped keys are skipped rather than failing the whole conversion, and each
//! one is reported with a `warn!` that names the kind and key only.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::remote::ConfigurationMap;
use crate::secret::SecretString;

/// How the remote service triggers runs for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStyle {
    /// Polled by the service; may carry a schedule.
    Pull,
    /// Triggered externally through a server-issued secret and URL; never scheduled.
    Push,
}

impl TriggerStyle {
    pub fn allows_schedule(self) -> bool {
        matches!(self, TriggerStyle::Pull)
    }
}

impl fmt::Display for TriggerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerStyle::Pull => f.write_str("pull"),
            TriggerStyle::Push => f.write_str("push"),
        }
    }
}

/// A configuration value with a native JSON representation.
pub trait FieldValue: Clone + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    /// `None` when the value has no JSON form (e.g. a NaN float).
    fn to_json(&self) -> Option<Value>;

    /// `None` when `value` is not of the expected JSON type.
    fn from_json(value: &Value) -> Option<Self>;
}

impl FieldValue for String {
    const TYPE_NAME: &'static str = "string";

    fn to_json(&self) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FieldValue for SecretString {
    const TYPE_NAME: &'static str = "string";

    fn to_json(&self) -> Option<Value> {
        Some(Value::String(self.expose().to_owned()))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(SecretString::new)
    }
}

impl FieldValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn to_json(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// Largest magnitude at which every integral `f64` is exact.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl FieldValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn to_json(&self) -> Option<Value> {
        Some(Value::Number(Number::from(*self)))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT)
                .map(|f| f as i64)
        })
    }
}

impl FieldValue for f64 {
    const TYPE_NAME: &'static str = "number";

    fn to_json(&self) -> Option<Value> {
        Number::from_f64(*self).map(Value::Number)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FieldValue for BTreeMap<String, String> {
    const TYPE_NAME: &'static str = "map of strings";

    fn to_json(&self) -> Option<Value> {
        Some(Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .iter()
            .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
            .collect()
    }
}

impl FieldValue for Vec<String> {
    const TYPE_NAME: &'static str = "list of strings";

    fn to_json(&self) -> Option<Value> {
        Some(Value::Array(self.iter().cloned().map(Value::String).collect()))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect()
    }
}

enum Encoded {
    Absent,
    Value(Value),
    Unrepresentable,
}

/// Type-erased access to one `Option<T>` slot of a configuration struct.
trait Slot<C>: Send + Sync {
    fn encode(&self, config: &C) -> Encoded;
    /// Returns `false` on a type mismatch, leaving the slot untouched.
    fn decode(&self, config: &mut C, value: &Value) -> bool;
    fn carry(&self, from: &C, to: &mut C);
    fn is_present(&self, config: &C) -> bool;
    fn type_name(&self) -> &'static str;
}

struct Accessor<C, T> {
    get: fn(&C) -> &Option<T>,
    get_mut: fn(&mut C) -> &mut Option<T>,
}

impl<C: 'static, T: FieldValue> Slot<C> for Accessor<C, T> {
    fn encode(&self, config: &C) -> Encoded {
        match (self.get)(config) {
            None => Encoded::Absent,
            Some(value) => match value.to_json() {
                Some(json) => Encoded::Value(json),
                None => Encoded::Unrepresentable,
            },
        }
    }

    fn decode(&self, config: &mut C, value: &Value) -> bool {
        match T::from_json(value) {
            Some(typed) => {
                *(self.get_mut)(config) = Some(typed);
                true
            }
            None => false,
        }
    }

    fn carry(&self, from: &C, to: &mut C) {
        *(self.get_mut)(to) = (self.get)(from).clone();
    }

    fn is_present(&self, config: &C) -> bool {
        (self.get)(config).is_some()
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }
}

/// One entry of a kind's configuration table.
pub struct Field<C> {
    key: &'static str,
    required: bool,
    sensitive: bool,
    slot: Box<dyn Slot<C>>,
}

impl<C: 'static> Field<C> {
    pub fn new<T: FieldValue>(
        key: &'static str,
        get: fn(&C) -> &Option<T>,
        get_mut: fn(&mut C) -> &mut Option<T>,
    ) -> Self {
        Self {
            key,
            required: false,
            sensitive: false,
            slot: Box::new(Accessor { get, get_mut }),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Credentials and tokens: never logged, and kept from the caller's model
    /// when the service omits them from a response.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }
}

/// Builds a [`Field`] whose wire key equals the struct field name.
#[macro_export]
macro_rules! field {
    ($config:ty, $name:ident) => {
        $crate::contract::Field::new(
            stringify!($name),
            |c: &$config| &c.$name,
            |c: &mut $config| &mut c.$name,
        )
    };
}

/// Bidirectional mapping for one kind: its tag, trigger style and field table.
pub struct Contract<C> {
    kind: &'static str,
    trigger: TriggerStyle,
    fields: Vec<Field<C>>,
}

impl<C: Default + 'static> Contract<C> {
    pub fn new(kind: &'static str, trigger: TriggerStyle, fields: Vec<Field<C>>) -> Self {
        Self {
            kind,
            trigger,
            fields,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn trigger(&self) -> TriggerStyle {
        self.trigger
    }

    pub fn fields(&self) -> &[Field<C>] {
        &self.fields
    }

    pub fn to_remote(&self, config: &C) -> Result<ConfigurationMap> {
        let mut map = ConfigurationMap::new();
        for field in &self.fields {
            match field.slot.encode(config) {
                Encoded::Value(value) => {
                    map.insert(field.key.to_string(), value);
                }
                Encoded::Absent if field.required => {
                    return Err(Error::InputValidation(format!(
                        "{}: configuration.{} is required",
                        self.kind, field.key
                    )));
                }
                Encoded::Absent => {}
                Encoded::Unrepresentable => {
                    return Err(Error::InputValidation(format!(
                        "{}: configuration.{} has no JSON representation",
                        self.kind, field.key
                    )));
                }
            }
        }
        Ok(map)
    }

    pub fn from_remote(&self, map: &ConfigurationMap) -> C {
        self.merge_remote(map, None)
    }

    /// Like [`from_remote`](Self::from_remote), but sensitive fields the
    /// service left out (or mistyped) keep their value from `prior`.
    pub fn merge_remote(&self, map: &ConfigurationMap, prior: Option<&C>) -> C {
        let mut config = C::default();
        for field in &self.fields {
            let decoded = match map.get(field.key) {
                Some(Value::Null) | None => false,
                Some(value) => {
                    let ok = field.slot.decode(&mut config, value);
                    if !ok {
                        warn!(
                            kind = self.kind,
                            key = field.key,
                            expected = field.slot.type_name(),
                            "Ignoring configuration field with unexpected type"
                        );
                    }
                    ok
                }
            };
            if !decoded && field.sensitive {
                if let Some(prior) = prior {
                    field.slot.carry(prior, &mut config);
                }
            }
        }

        let unknown: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| !self.fields.iter().any(|f| f.key == *key))
            .collect();
        if !unknown.is_empty() {
            debug!(kind = self.kind, ?unknown, "Ignoring unrecognised configuration keys");
        }
        config
    }

    /// Keys of the fields currently present in `config`.
    pub fn present_keys(&self, config: &C) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.slot.is_present(config))
            .map(|f| f.key)
            .collect()
    }
}
