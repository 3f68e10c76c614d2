use super::macros;
use shared::model::QuotaConfigDto;
use shared::utils::mins_to_millis;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub window_millis: i64,
    pub max_requests_in_window: u32,
    pub max_simultaneous_playlists: u32,
    pub permanent_threshold: u32,
    pub permanent_enabled: bool,
    pub sweep_interval: Duration,
}

macros::from_impl!(QuotaConfig);
impl From<&QuotaConfigDto> for QuotaConfig {
    fn from(dto: &QuotaConfigDto) -> Self {
        Self {
            window_millis: mins_to_millis(dto.window_mins),
            max_requests_in_window: dto.max_requests_in_window,
            max_simultaneous_playlists: dto.max_simultaneous_playlists,
            permanent_threshold: dto.permanent_threshold,
            permanent_enabled: dto.permanent_enabled,
            sweep_interval: Duration::from_secs(dto.sweep_interval_secs.max(1)),
        }
    }
}
