use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyRecord {
    pub stream_id: String,
    pub username: String,
    pub channel_id: String,
    pub client_ip: String,
    pub start_time: i64,
    pub last_activity: i64,
}

impl ConcurrencyRecord {
    pub fn is_idle(&self, now: i64, inactivity_timeout_millis: i64) -> bool {
        now - self.last_activity > inactivity_timeout_millis
    }

    pub fn matches(&self, channel_id: &str, client_ip: &str) -> bool {
        self.channel_id == channel_id && self.client_ip == client_ip
    }
}

/// All live streams of one user, stored under the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStreams {
    pub username: String,
    pub records: Vec<ConcurrencyRecord>,
}

impl UserStreams {
    pub fn new(username: &str) -> Self {
        Self { username: username.to_string(), records: Vec::new() }
    }

    /// Removes idle records, returns how many were dropped.
    pub fn purge_idle(&mut self, now: i64, inactivity_timeout_millis: i64) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !r.is_idle(now, inactivity_timeout_millis));
        before - self.records.len()
    }

    pub fn distinct_devices(&self) -> usize {
        let mut ips: Vec<&str> = self.records.iter().map(|r| r.client_ip.as_str()).collect();
        ips.sort_unstable();
        ips.dedup();
        ips.len()
    }

    pub fn has_device(&self, client_ip: &str) -> bool {
        self.records.iter().any(|r| r.client_ip == client_ip)
    }
}
