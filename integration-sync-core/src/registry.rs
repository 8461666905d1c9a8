//! # registry: the supported kinds, wired to one shared transport
//!
//! [`Registry::configure`] builds exactly one [`Transport`] from the connection
//! parameters and hands the same instance to every controller, so the
//! in-flight ceiling applies process-wide rather than per kind.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::contract::TriggerStyle;
use crate::error::{Error, Result};
use crate::kinds::{
    DbtCoreConfiguration, FivetranConfiguration, HexConfiguration, KindConfiguration,
    SnowflakeConfiguration,
};
use crate::lifecycle::{Controller, Reconciler};
use crate::transport::Transport;

/// One row of the kind table.
#[derive(Clone, Copy)]
pub struct KindInfo {
    pub name: &'static str,
    pub trigger: TriggerStyle,
    pub build: fn(Arc<Transport>) -> Arc<dyn Reconciler>,
}

impl std::fmt::Debug for KindInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindInfo")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .finish()
    }
}

fn build<C: KindConfiguration>(transport: Arc<Transport>) -> Arc<dyn Reconciler> {
    Arc::new(Controller::<C>::new(transport))
}

const fn kind<C: KindConfiguration>() -> KindInfo {
    KindInfo {
        name: C::KIND,
        trigger: C::TRIGGER,
        build: build::<C>,
    }
}

pub const KINDS: &[KindInfo] = &[
    kind::<SnowflakeConfiguration>(),
    kind::<FivetranConfiguration>(),
    kind::<HexConfiguration>(),
    kind::<DbtCoreConfiguration>(),
];

pub fn kind_info(name: &str) -> Option<&'static KindInfo> {
    KINDS.iter().find(|info| info.name == name)
}

pub struct Registry {
    transport: Arc<Transport>,
    snowflake: Controller<SnowflakeConfiguration>,
    fivetran: Controller<FivetranConfiguration>,
    hex: Controller<HexConfiguration>,
    dbt_core: Controller<DbtCoreConfiguration>,
    reconcilers: BTreeMap<&'static str, Arc<dyn Reconciler>>,
}

impl Registry {
    pub fn configure(config: &ProviderConfig) -> Result<Self> {
        config.trace_loaded();
        let transport = Transport::connect(config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<Transport>) -> Self {
        let reconcilers = KINDS
            .iter()
            .map(|info| {
                debug!(kind = info.name, trigger = %info.trigger, "Registering kind");
                (info.name, (info.build)(Arc::clone(&transport)))
            })
            .collect();
        info!(
            kinds = KINDS.len(),
            account_id = transport.account_id(),
            "Registry configured"
        );
        Self {
            snowflake: Controller::new(Arc::clone(&transport)),
            fivetran: Controller::new(Arc::clone(&transport)),
            hex: Controller::new(Arc::clone(&transport)),
            dbt_core: Controller::new(Arc::clone(&transport)),
            reconcilers,
            transport,
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn snowflake(&self) -> &Controller<SnowflakeConfiguration> {
        &self.snowflake
    }

    pub fn fivetran(&self) -> &Controller<FivetranConfiguration> {
        &self.fivetran
    }

    pub fn hex(&self) -> &Controller<HexConfiguration> {
        &self.hex
    }

    pub fn dbt_core(&self) -> &Controller<DbtCoreConfiguration> {
        &self.dbt_core
    }

    pub fn reconciler(&self, kind: &str) -> Result<Arc<dyn Reconciler>> {
        self.reconcilers.get(kind).cloned().ok_or_else(|| {
            Error::InputValidation(format!(
                "unknown integration kind `{kind}` (known: {})",
                KINDS.iter().map(|k| k.name).collect::<Vec<_>>().join(", ")
            ))
        })
    }
}
