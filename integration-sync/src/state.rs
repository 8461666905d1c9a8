//! JSON state file: the observed state of every managed resource, by address.
//!
//! The file is rewritten atomically (temp file in the same directory, then
//! rename) and only after a remote operation confirmed success. It contains
//! credentials and trigger secrets in clear text, like any infrastructure state
//! file, so it must be stored accordingly.

use anyhow::{anyhow, Context, Result};
use integration_sync_core::remote::IntegrationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    pub kind: String,
    /// A serialized `ResourceState` of that kind.
    pub state: Value,
}

impl StoredResource {
    pub fn id(&self) -> Result<IntegrationId> {
        let raw = self
            .state
            .get("id")
            .cloned()
            .ok_or_else(|| anyhow!("stored state has no integration id"))?;
        serde_json::from_value(raw).context("stored integration id is not numeric")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub resources: BTreeMap<String, StoredResource>,
}

pub struct StateFile {
    path: PathBuf,
    document: StateDocument,
}

impl StateFile {
    /// Opens `path`; a missing file is an empty state.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("state file {path:?} is not valid JSON state"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(state_path = ?path, "No state file yet, starting empty");
                StateDocument::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read state file {path:?}"))
            }
        };
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, address: &str) -> Option<&StoredResource> {
        self.document.resources.get(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.document.resources.keys().map(String::as_str)
    }

    pub fn put(&mut self, address: &str, kind: &str, state: Value) {
        self.document.resources.insert(
            address.to_string(),
            StoredResource {
                kind: kind.to_string(),
                state,
            },
        );
    }

    pub fn remove(&mut self, address: &str) -> Option<StoredResource> {
        self.document.resources.remove(address)
    }

    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let body = serde_json::to_vec_pretty(&self.document).context("failed to encode state")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed to create temp state file in {dir:?}"))?;
        tmp.write_all(&body).context("failed to write state")?;
        tmp.write_all(b"\n").context("failed to write state")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to replace state file {:?}", self.path))?;
        info!(
            state_path = ?self.path,
            resources = self.document.resources.len(),
            "State file saved"
        );
        Ok(())
    }
}
