use super::macros;
use shared::model::TokenConfigDto;
use shared::utils::{hours_to_millis, mins_to_millis};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub ip_binding: bool,
    pub usage_limit: u32,
    pub permanent_usage_cap: u32,
    pub link_expiry_millis: i64,
    pub usage_retention_millis: i64,
    pub sweep_interval: Duration,
}

macros::from_impl!(TokenConfig);
impl From<&TokenConfigDto> for TokenConfig {
    fn from(dto: &TokenConfigDto) -> Self {
        Self {
            ip_binding: dto.ip_binding,
            usage_limit: dto.usage_limit,
            permanent_usage_cap: dto.usage_limit.saturating_mul(dto.permanent_usage_multiplier.max(1)),
            link_expiry_millis: mins_to_millis(dto.link_expiry_mins),
            usage_retention_millis: hours_to_millis(dto.usage_retention_hours),
            sweep_interval: Duration::from_secs(dto.sweep_interval_secs.max(1)),
        }
    }
}
