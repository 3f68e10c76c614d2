use crate::utils::{default_concurrency_sweep_interval_secs, default_inactivity_timeout_secs, default_max_devices};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcurrencyConfigDto {
    /// Default device cap, used when a credential has no own `max_connections`.
    /// 0 disables the limit.
    #[serde(default = "default_max_devices")]
    pub max_devices: u32,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_concurrency_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ConcurrencyConfigDto {
    fn default() -> Self {
        Self {
            max_devices: default_max_devices(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            sweep_interval_secs: default_concurrency_sweep_interval_secs(),
        }
    }
}
