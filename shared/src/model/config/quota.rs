use crate::error::{info_err, GatewayError};
use crate::utils::{default_as_true, default_max_requests_in_window, default_max_simultaneous_playlists,
                   default_permanent_threshold, default_quota_sweep_interval_secs, default_window_mins};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfigDto {
    #[serde(default = "default_window_mins")]
    pub window_mins: u64,
    #[serde(default = "default_max_requests_in_window")]
    pub max_requests_in_window: u32,
    #[serde(default = "default_max_simultaneous_playlists")]
    pub max_simultaneous_playlists: u32,
    #[serde(default = "default_permanent_threshold")]
    pub permanent_threshold: u32,
    #[serde(default = "default_as_true")]
    pub permanent_enabled: bool,
    #[serde(default = "default_quota_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for QuotaConfigDto {
    fn default() -> Self {
        Self {
            window_mins: default_window_mins(),
            max_requests_in_window: default_max_requests_in_window(),
            max_simultaneous_playlists: default_max_simultaneous_playlists(),
            permanent_threshold: default_permanent_threshold(),
            permanent_enabled: default_as_true(),
            sweep_interval_secs: default_quota_sweep_interval_secs(),
        }
    }
}

impl QuotaConfigDto {
    pub fn prepare(&mut self) -> Result<(), GatewayError> {
        if self.window_mins == 0 {
            return Err(info_err!("quota.window_mins must be greater than 0"));
        }
        if self.max_simultaneous_playlists == 0 {
            return Err(info_err!("quota.max_simultaneous_playlists must be greater than 0"));
        }
        Ok(())
    }
}
