use serde::{Deserialize, Serialize};

use crate::contract::{Contract, TriggerStyle};
use crate::field;
use crate::kinds::KindConfiguration;
use crate::secret::SecretString;

/// Snowflake warehouse metadata, usage and lineage extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnowflakeConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_to_use_for_query_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_where_clause_for_query_history_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_platform_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_base_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_views: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_tables: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_tableau_usage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_daily_usage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_daily_dml_summary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_materialized_views_refresh_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_hex_usage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_hex_lineage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_hex_lineage_lookback_days: Option<i64>,
    /// Dollars per Snowflake credit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_credit: Option<f64>,
    /// Dollars per terabyte stored per month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_cost_per_tb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe_warehouses: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_snowflake_database: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_lineage_from_query_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage_lookback_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe_inbound_shares: Option<bool>,
}

impl KindConfiguration for SnowflakeConfiguration {
    const KIND: &'static str = "snowflake";
    const TRIGGER: TriggerStyle = TriggerStyle::Pull;

    fn contract() -> Contract<Self> {
        type C = SnowflakeConfiguration;
        Contract::new(
            Self::KIND,
            Self::TRIGGER,
            vec![
                field!(C, host).required(),
                field!(C, user).required(),
                field!(C, password).sensitive(),
                field!(C, private_key).sensitive(),
                field!(C, role),
                field!(C, warehouse),
                field!(C, database),
                field!(C, table_to_use_for_query_history),
                field!(C, additional_where_clause_for_query_history_query),
                field!(C, override_platform_uri),
                field!(C, override_base_uri),
                field!(C, extract_views),
                field!(C, extract_tables),
                field!(C, extract_tableau_usage),
                field!(C, extract_daily_usage),
                field!(C, extract_daily_dml_summary),
                field!(C, extract_materialized_views_refresh_history),
                field!(C, extract_hex_usage),
                field!(C, extract_hex_lineage),
                field!(C, extract_hex_lineage_lookback_days),
                field!(C, cost_per_credit),
                field!(C, storage_cost_per_tb),
                field!(C, observe_warehouses),
                field!(C, use_snowflake_database),
                field!(C, extract_lineage_from_query_history),
                field!(C, lineage_lookback_days),
                field!(C, observe_inbound_shares),
            ],
        )
    }
}
