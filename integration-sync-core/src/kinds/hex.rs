use serde::{Deserialize, Serialize};

use crate::contract::{Contract, TriggerStyle};
use crate::field;
use crate::kinds::KindConfiguration;
use crate::secret::SecretString;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HexConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
}

impl KindConfiguration for HexConfiguration {
    const KIND: &'static str = "hex";
    const TRIGGER: TriggerStyle = TriggerStyle::Pull;

    fn contract() -> Contract<Self> {
        type C = HexConfiguration;
        Contract::new(
            Self::KIND,
            Self::TRIGGER,
            vec![
                field!(C, api_token).required().sensitive(),
                field!(C, workspace_id).required(),
                field!(C, base_url),
                field!(C, workspace_name),
            ],
        )
    }
}
