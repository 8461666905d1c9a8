use serde::{Deserialize, Serialize};

use crate::contract::{Contract, TriggerStyle};
use crate::field;
use crate::kinds::KindConfiguration;
use crate::secret::SecretString;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FivetranConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl KindConfiguration for FivetranConfiguration {
    const KIND: &'static str = "fivetran";
    const TRIGGER: TriggerStyle = TriggerStyle::Pull;

    fn contract() -> Contract<Self> {
        type C = FivetranConfiguration;
        Contract::new(
            Self::KIND,
            Self::TRIGGER,
            vec![
                field!(C, api_key).required().sensitive(),
                field!(C, api_secret).required().sensitive(),
                field!(C, base_url),
            ],
        )
    }
}
