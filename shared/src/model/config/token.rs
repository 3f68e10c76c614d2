use crate::error::{info_err, GatewayError};
use crate::utils::{default_as_false, default_link_expiry_mins, default_permanent_usage_multiplier,
                   default_token_sweep_interval_secs, default_token_usage_limit, default_usage_retention_hours};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfigDto {
    /// Bind tokens to the client ip that fetched the playlist.
    #[serde(default = "default_as_false")]
    pub ip_binding: bool,
    #[serde(default = "default_token_usage_limit")]
    pub usage_limit: u32,
    #[serde(default = "default_permanent_usage_multiplier")]
    pub permanent_usage_multiplier: u32,
    #[serde(default = "default_link_expiry_mins")]
    pub link_expiry_mins: u64,
    #[serde(default = "default_usage_retention_hours")]
    pub usage_retention_hours: u64,
    #[serde(default = "default_token_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for TokenConfigDto {
    fn default() -> Self {
        Self {
            ip_binding: default_as_false(),
            usage_limit: default_token_usage_limit(),
            permanent_usage_multiplier: default_permanent_usage_multiplier(),
            link_expiry_mins: default_link_expiry_mins(),
            usage_retention_hours: default_usage_retention_hours(),
            sweep_interval_secs: default_token_sweep_interval_secs(),
        }
    }
}

impl TokenConfigDto {
    pub fn prepare(&mut self) -> Result<(), GatewayError> {
        if self.usage_limit == 0 {
            return Err(info_err!("token.usage_limit must be greater than 0"));
        }
        if self.link_expiry_mins == 0 {
            return Err(info_err!("token.link_expiry_mins must be greater than 0"));
        }
        if self.permanent_usage_multiplier == 0 {
            self.permanent_usage_multiplier = 1;
        }
        Ok(())
    }
}
