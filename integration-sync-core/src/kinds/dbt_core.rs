use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::contract::{Contract, TriggerStyle};
use crate::field;
use crate::kinds::KindConfiguration;

/// dbt Core project pushed by an external CI job through the trigger URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbtCoreConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_target: Option<String>,
    /// `db.schema` in the manifest mapped to the `db.schema` to ingest into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemas_aliases: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_build_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbt_project_root_directory_in_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_resources_with_no_catalog_entry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_uri_prefix: Option<String>,
}

impl KindConfiguration for DbtCoreConfiguration {
    const KIND: &'static str = "dbt_core";
    const TRIGGER: TriggerStyle = TriggerStyle::Push;

    fn contract() -> Contract<Self> {
        type C = DbtCoreConfiguration;
        Contract::new(
            Self::KIND,
            Self::TRIGGER,
            vec![
                field!(C, build_target).required(),
                field!(C, schemas_aliases),
                field!(C, repository_url),
                field!(C, stage_build_target),
                field!(C, repository_branch),
                field!(C, dbt_project_root_directory_in_repository),
                field!(C, repository_revision),
                field!(C, allow_resources_with_no_catalog_entry),
                field!(C, override_uri_prefix),
            ],
        )
    }
}
