//! # kinds: the fixed set of supported integration kinds
//!
//! Each kind is a plain configuration struct (every field an `Option`) plus a
//! [`Contract`] describing its wire keys. Adding a kind means adding one module
//! here and one row to [`crate::registry::KINDS`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::contract::{Contract, TriggerStyle};

pub mod dbt_core;
pub mod fivetran;
pub mod hex;
pub mod snowflake;

pub use dbt_core::DbtCoreConfiguration;
pub use fivetran::FivetranConfiguration;
pub use hex::HexConfiguration;
pub use snowflake::SnowflakeConfiguration;

/// Typed configuration of one integration kind.
pub trait KindConfiguration:
    Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Kind tag as sent in `integration_type`.
    const KIND: &'static str;
    const TRIGGER: TriggerStyle;

    fn contract() -> Contract<Self>;
}
