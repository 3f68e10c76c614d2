use super::macros;
use shared::model::CredentialPolicyConfigDto;
use shared::utils::hours_to_millis;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CredentialPolicyConfig {
    pub expiry_warning_millis: i64,
    pub sweep_interval: Duration,
    pub default_validity_millis: Option<i64>,
}

macros::from_impl!(CredentialPolicyConfig);
impl From<&CredentialPolicyConfigDto> for CredentialPolicyConfig {
    fn from(dto: &CredentialPolicyConfigDto) -> Self {
        Self {
            expiry_warning_millis: hours_to_millis(dto.expiry_warning_hours),
            sweep_interval: Duration::from_secs(dto.sweep_interval_secs.max(1)),
            default_validity_millis: dto.default_validity_hours.map(hours_to_millis),
        }
    }
}
