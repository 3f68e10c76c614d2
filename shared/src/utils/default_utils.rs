// Defaults for the gateway configuration. All durations are in the unit named by the field.

pub const fn default_as_true() -> bool { true }
pub const fn default_as_false() -> bool { false }

pub fn default_host() -> String { String::from("0.0.0.0") }
pub const fn default_port() -> u16 { 8901 }
pub fn default_storage_dir() -> String { String::from("./data") }

// Token codec
pub const fn default_token_usage_limit() -> u32 { 100 }
pub const fn default_permanent_usage_multiplier() -> u32 { 10 }
pub const fn default_link_expiry_mins() -> u64 { 120 }
pub const fn default_usage_retention_hours() -> u64 { 48 }
pub const fn default_token_sweep_interval_secs() -> u64 { 900 }

// Quota engine
pub const fn default_window_mins() -> u64 { 300 }
pub const fn default_max_requests_in_window() -> u32 { 10 }
pub const fn default_max_simultaneous_playlists() -> u32 { 3 }
pub const fn default_permanent_threshold() -> u32 { 3 }
pub const fn default_quota_sweep_interval_secs() -> u64 { 300 }

// Concurrency limiter
pub const fn default_max_devices() -> u32 { 3 }
pub const fn default_inactivity_timeout_secs() -> u64 { 300 }
pub const fn default_concurrency_sweep_interval_secs() -> u64 { 60 }

// Persistence
pub const fn default_snapshot_interval_secs() -> u64 { 60 }

// Catalog
pub const fn default_catalog_refresh_mins() -> u64 { 60 }
pub const fn default_catalog_timeout_secs() -> u64 { 30 }

// External calls
pub const fn default_group_check_timeout_secs() -> u64 { 5 }
pub const fn default_credential_sweep_interval_secs() -> u64 { 3600 }
pub const fn default_expiry_warning_hours() -> u64 { 24 }
pub const fn default_connect_timeout_secs() -> u32 { 6 }
