#![doc = "integration-sync-core: reconcile declared integrations against the remote integrations API."]

//! This crate holds the rate-limited transport, the per-kind conversion
//! contracts and the lifecycle controllers built on them. It has no notion of
//! files, plans or CLI flags; callers supply typed (or JSON) desired state and
//! persist whatever state the controllers return.
//!
//! # Usage
//! Build a [`registry::Registry`] from a [`config::ProviderConfig`], then drive
//! a kind's controller (`registry.hex().create(..)`) or dispatch by tag with
//! `registry.reconciler("hex")`.

pub mod blocks;
pub mod config;
pub mod contract;
pub mod error;
pub mod kinds;
pub mod lifecycle;
pub mod model;
pub mod registry;
pub mod remote;
pub mod secret;
pub mod transport;

pub use error::{Error, Result};
