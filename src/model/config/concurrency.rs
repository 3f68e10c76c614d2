use super::macros;
use shared::model::ConcurrencyConfigDto;
use shared::utils::secs_to_millis;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    pub max_devices: u32,
    pub inactivity_timeout_millis: i64,
    pub sweep_interval: Duration,
}

macros::from_impl!(ConcurrencyConfig);
impl From<&ConcurrencyConfigDto> for ConcurrencyConfig {
    fn from(dto: &ConcurrencyConfigDto) -> Self {
        Self {
            max_devices: dto.max_devices,
            inactivity_timeout_millis: secs_to_millis(dto.inactivity_timeout_secs),
            sweep_interval: Duration::from_secs(dto.sweep_interval_secs.max(1)),
        }
    }
}
