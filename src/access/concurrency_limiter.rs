use crate::model::{ConcurrencyConfig, ConcurrencyRecord, UserStreams};
use crate::repository::{StateStore, SweepAction};
use crate::utils::{debug_if_enabled, Clock};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub session_id: String,
    pub reused: bool,
    pub active_devices: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyDenied {
    pub current_devices: u32,
    pub max_devices: u32,
}

impl ConcurrencyDenied {
    pub const fn code(self) -> &'static str {
        "CONCURRENCY_LIMIT"
    }
}

impl Display for ConcurrencyDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Too many devices streaming ({}/{})", self.current_devices, self.max_devices)
    }
}

impl std::error::Error for ConcurrencyDenied {}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Per user device admission. A device is a client ip; all streams of one
/// user are checked and changed under the same map entry.
pub struct ConcurrencyLimiter {
    config: ConcurrencyConfig,
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
}

impl ConcurrencyLimiter {
    pub fn new(config: ConcurrencyConfig, store: Arc<StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { config, store, clock }
    }

    pub fn default_device_cap(&self) -> u32 {
        self.config.max_devices
    }

    /// Admits a stream. `device_cap` 0 means unlimited.
    pub fn admit(&self, username: &str, channel_id: &str, client_ip: &str, device_cap: u32) -> Result<Admission, ConcurrencyDenied> {
        let now = self.clock.now_millis();
        let timeout = self.config.inactivity_timeout_millis;
        let result = self.store.streams().update(username, || UserStreams::new(username), |streams| {
            streams.purge_idle(now, timeout);

            if let Some(record) = streams.records.iter_mut().find(|r| r.matches(channel_id, client_ip)) {
                record.last_activity = now;
                let session_id = record.stream_id.clone();
                return Ok(Admission { session_id, reused: true, active_devices: to_u32(streams.distinct_devices()) });
            }

            let devices = to_u32(streams.distinct_devices());
            if device_cap > 0 && devices >= device_cap && !streams.has_device(client_ip) {
                return Err(ConcurrencyDenied { current_devices: devices, max_devices: device_cap });
            }

            let session_id = uuid::Uuid::new_v4().to_string();
            streams.records.push(ConcurrencyRecord {
                stream_id: session_id.clone(),
                username: username.to_string(),
                channel_id: channel_id.to_string(),
                client_ip: client_ip.to_string(),
                start_time: now,
                last_activity: now,
            });
            Ok(Admission { session_id, reused: false, active_devices: to_u32(streams.distinct_devices()) })
        });
        if let Err(denied) = &result {
            debug_if_enabled!("Stream of {} on {} denied: {}", username, channel_id, denied);
        }
        result
    }

    /// Refreshes a live stream. Returns false if there is none.
    pub fn heartbeat(&self, username: &str, channel_id: &str, client_ip: &str) -> bool {
        let now = self.clock.now_millis();
        self.store.streams().update_existing(username, |streams| {
            streams.records.iter_mut()
                .find(|r| r.matches(channel_id, client_ip))
                .map(|record| record.last_activity = now)
                .is_some()
        }).unwrap_or(false)
    }

    pub fn release(&self, username: &str, channel_id: &str, client_ip: &str) -> bool {
        let released = self.store.streams().update_existing(username, |streams| {
            let before = streams.records.len();
            streams.records.retain(|r| !r.matches(channel_id, client_ip));
            before != streams.records.len()
        }).unwrap_or(false);
        self.store.streams().remove_if(username, |streams| streams.records.is_empty());
        released
    }

    /// Drops all streams of a user. Returns how many were live.
    pub fn release_user(&self, username: &str) -> usize {
        self.store.streams().remove(username).map_or(0, |streams| streams.records.len())
    }

    pub fn active_devices(&self, username: &str) -> u32 {
        let now = self.clock.now_millis();
        let timeout = self.config.inactivity_timeout_millis;
        self.store.streams().read(username, |streams| {
            let mut ips: Vec<&str> = streams.records.iter()
                .filter(|r| !r.is_idle(now, timeout))
                .map(|r| r.client_ip.as_str())
                .collect();
            ips.sort_unstable();
            ips.dedup();
            to_u32(ips.len())
        }).unwrap_or(0)
    }

    /// Removes idle streams of all users. Returns the number of removed streams.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let timeout = self.config.inactivity_timeout_millis;
        let mut removed = 0;
        self.store.streams().retain_mut(|_, streams| {
            let purged = streams.purge_idle(now, timeout);
            removed += purged;
            if streams.records.is_empty() {
                SweepAction::Remove
            } else if purged > 0 {
                SweepAction::Changed
            } else {
                SweepAction::Keep
            }
        });
        removed
    }
}
