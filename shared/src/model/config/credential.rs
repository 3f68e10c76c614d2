use crate::utils::{default_credential_sweep_interval_secs, default_expiry_warning_hours};

/// User defined in the config file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfigDto {
    pub username: String,
    /// Plain text or an argon2 encoded hash (`$argon2...`).
    pub password: String,
    #[serde(default)]
    pub max_connections: u32,
    /// Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialPolicyConfigDto {
    #[serde(default = "default_expiry_warning_hours")]
    pub expiry_warning_hours: u64,
    #[serde(default = "default_credential_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Validity of issued credentials when the caller does not pass one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_validity_hours: Option<u64>,
}

impl Default for CredentialPolicyConfigDto {
    fn default() -> Self {
        Self {
            expiry_warning_hours: default_expiry_warning_hours(),
            sweep_interval_secs: default_credential_sweep_interval_secs(),
            default_validity_hours: None,
        }
    }
}
