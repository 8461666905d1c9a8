//! CLI glue: argument parsing, state-file bookkeeping and dispatch to the core.
//!
//! Every lifecycle subcommand names one resource by `--address`. The desired
//! spec comes from the YAML config, the last observed state from the JSON state
//! file. All reconciliation logic lives in `integration-sync-core`; this module
//! only decides which operation to call and what to persist afterwards.
//!
//! The state file is rewritten only after the remote service confirmed the
//! change. Ctrl-C cancels the operation in flight.

use crate::load_config::{load_config, CliConfig};
use crate::state::StateFile;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use integration_sync_core::registry::{Registry, KINDS};
use std::fmt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Reconcile integrations declared in YAML against the remote integrations API.
#[derive(Parser)]
#[clap(name = "integration-sync", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the supported integration kinds
    Kinds,
    /// Create the resource remotely and start tracking it
    Create(Target),
    /// Refresh the tracked state from the remote service
    Read(Target),
    /// Push the declared spec to the tracked integration
    Update(Target),
    /// Delete the tracked integration and stop tracking it
    Delete(Target),
    /// Start tracking an existing integration by its numeric id
    Import {
        #[clap(flatten)]
        target: Target,
        #[clap(long)]
        id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: PathBuf,
    /// Path to the JSON state file (created if missing)
    #[clap(long)]
    pub state: PathBuf,
    /// Address of the resource within the config
    #[clap(long)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Import { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { address: String, id: i64 },
    Refreshed { address: String, id: i64 },
    /// The integration no longer exists remotely; the address was dropped from state.
    Vanished { address: String },
    Updated { address: String, id: i64 },
    Deleted { address: String },
    Imported { address: String, id: i64 },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created { address, id } => write!(f, "{address}: created integration {id}"),
            Outcome::Refreshed { address, id } => write!(f, "{address}: refreshed integration {id}"),
            Outcome::Vanished { address } => {
                write!(f, "{address}: integration no longer exists remotely, removed from state")
            }
            Outcome::Updated { address, id } => write!(f, "{address}: updated integration {id}"),
            Outcome::Deleted { address } => write!(f, "{address}: deleted"),
            Outcome::Imported { address, id } => write!(f, "{address}: imported integration {id}"),
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let (target, action) = match cli.command {
        Commands::Kinds => {
            for kind in KINDS {
                println!("{}\t{}", kind.name, kind.trigger);
            }
            return Ok(());
        }
        Commands::Create(target) => (target, Action::Create),
        Commands::Read(target) => (target, Action::Read),
        Commands::Update(target) => (target, Action::Update),
        Commands::Delete(target) => (target, Action::Delete),
        Commands::Import { target, id } => (target, Action::Import { id }),
    };

    let config = load_config(&target.config)?;
    let provider = config.provider_config()?;
    let registry = Registry::configure(&provider).context("failed to configure registry")?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling operation");
            watcher.cancel();
        }
    });

    let outcome = reconcile(&registry, &config, &target, action, &cancel).await?;
    println!("{outcome}");
    Ok(())
}

/// Runs one lifecycle action for `target.address` and persists the result.
pub async fn reconcile(
    registry: &Registry,
    config: &CliConfig,
    target: &Target,
    action: Action,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let address = target.address.as_str();
    let mut state = StateFile::load(&target.state)?;
    info!(address, action = ?action, state_path = ?state.path(), "Reconciling resource");

    let outcome = match action {
        Action::Create => {
            if state.get(address).is_some() {
                bail!("`{address}` is already tracked in state; use `update`");
            }
            let entry = config.resource(address)?;
            let reconciler = registry.reconciler(&entry.kind)?;
            let result = reconciler
                .create(cancel, entry.desired())
                .await
                .with_context(|| format!("create of `{address}` failed"))?;
            state.put(address, &entry.kind, result);
            let id = state_id(&state, address)?;
            Outcome::Created {
                address: address.to_string(),
                id,
            }
        }
        Action::Read => {
            let stored = tracked(&state, address)?.clone();
            let reconciler = registry.reconciler(&stored.kind)?;
            match reconciler.read(cancel, stored.state.clone()).await {
                Ok(result) => {
                    state.put(address, &stored.kind, result);
                    Outcome::Refreshed {
                        address: address.to_string(),
                        id: stored.id()?.get(),
                    }
                }
                Err(e) if e.is_not_found() => {
                    warn!(address, "Tracked integration vanished remotely, dropping it from state");
                    state.remove(address);
                    Outcome::Vanished {
                        address: address.to_string(),
                    }
                }
                Err(e) => {
                    error!(address, error = %e, "Read failed");
                    return Err(e).with_context(|| format!("read of `{address}` failed"));
                }
            }
        }
        Action::Update => {
            let stored = tracked(&state, address)?.clone();
            let entry = config.resource(address)?;
            if entry.kind != stored.kind {
                bail!(
                    "`{address}` is tracked as `{}` but declared as `{}`; delete and recreate it",
                    stored.kind,
                    entry.kind
                );
            }
            let id = stored.id()?;
            let reconciler = registry.reconciler(&stored.kind)?;
            let result = reconciler
                .update(cancel, id, entry.desired())
                .await
                .with_context(|| format!("update of `{address}` failed"))?;
            state.put(address, &stored.kind, result);
            Outcome::Updated {
                address: address.to_string(),
                id: id.get(),
            }
        }
        Action::Delete => {
            let stored = tracked(&state, address)?.clone();
            let reconciler = registry.reconciler(&stored.kind)?;
            reconciler
                .delete(cancel, stored.id()?)
                .await
                .with_context(|| format!("delete of `{address}` failed"))?;
            state.remove(address);
            Outcome::Deleted {
                address: address.to_string(),
            }
        }
        Action::Import { id } => {
            if state.get(address).is_some() {
                bail!("`{address}` is already tracked in state");
            }
            let entry = config.resource(address)?;
            let reconciler = registry.reconciler(&entry.kind)?;
            let imported = reconciler.import(&id)?;
            // An imported identity is unusable until read.
            let result = reconciler
                .read(cancel, imported)
                .await
                .with_context(|| format!("read of imported `{address}` failed"))?;
            state.put(address, &entry.kind, result);
            let id = state_id(&state, address)?;
            Outcome::Imported {
                address: address.to_string(),
                id,
            }
        }
    };

    state.save()?;
    info!(address, outcome = %outcome, "Resource reconciled");
    Ok(outcome)
}

fn tracked<'a>(state: &'a StateFile, address: &str) -> Result<&'a crate::state::StoredResource> {
    state
        .get(address)
        .with_context(|| format!("`{address}` is not tracked in state; create or import it first"))
}

fn state_id(state: &StateFile, address: &str) -> Result<i64> {
    Ok(tracked(state, address)?.id()?.get())
}
