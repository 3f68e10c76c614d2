use crate::repository::SweepAction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePlaylist {
    pub id: String,
    pub created_at: i64,
    pub is_permanent: bool,
    pub client_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub username: String,
    pub request_timestamps: Vec<i64>,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<i64>,
    pub active_playlists: Vec<ActivePlaylist>,
}

impl QuotaRecord {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            request_timestamps: Vec::new(),
            disabled: false,
            disabled_at: None,
            active_playlists: Vec::new(),
        }
    }

    /// Drops timestamps which left the sliding window. Returns the number dropped.
    pub fn prune_window(&mut self, now: i64, window_millis: i64) -> usize {
        let before = self.request_timestamps.len();
        self.request_timestamps.retain(|ts| now - ts < window_millis);
        before - self.request_timestamps.len()
    }

    /// Drops temporary playlists older than the link expiry. Permanent ones stay.
    pub fn prune_playlists(&mut self, now: i64, link_expiry_millis: i64) -> usize {
        let before = self.active_playlists.len();
        self.active_playlists.retain(|p| p.is_permanent || now - p.created_at < link_expiry_millis);
        before - self.active_playlists.len()
    }

    pub fn disable(&mut self, disabled_at: i64) {
        self.disabled = true;
        self.disabled_at = Some(disabled_at);
    }

    pub fn cooldown_remaining(&self, now: i64, window_millis: i64) -> i64 {
        match (self.disabled, self.disabled_at) {
            (true, Some(at)) => (window_millis - (now - at)).max(0),
            _ => 0,
        }
    }

    pub fn cooldown_elapsed(&self, now: i64, window_millis: i64) -> bool {
        self.disabled_at.is_none_or(|at| now - at >= window_millis)
    }

    pub fn reactivate(&mut self) {
        self.disabled = false;
        self.disabled_at = None;
        self.request_timestamps.clear();
    }

    pub fn has_playlist(&self, playlist_id: &str) -> bool {
        self.active_playlists.iter().any(|p| p.id == playlist_id)
    }

    /// Brings the record up to `now`.
    pub fn refresh(&mut self, now: i64, window_millis: i64, link_expiry_millis: i64) -> SweepAction {
        let mut changed = false;
        if self.disabled && self.cooldown_elapsed(now, window_millis) {
            self.reactivate();
            changed = true;
        }
        changed |= self.prune_window(now, window_millis) > 0;
        changed |= self.prune_playlists(now, link_expiry_millis) > 0;
        if !self.disabled && self.request_timestamps.is_empty() && self.active_playlists.is_empty() {
            SweepAction::Remove
        } else if changed {
            SweepAction::Changed
        } else {
            SweepAction::Keep
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPlaylistHistory {
    pub username: String,
    pub total_requests: u64,
    pub first_request_time: i64,
    pub last_request_time: i64,
    pub qualified_for_permanent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification_time: Option<i64>,
}

impl UserPlaylistHistory {
    pub fn new(username: &str, now: i64) -> Self {
        Self {
            username: username.to_string(),
            total_requests: 0,
            first_request_time: now,
            last_request_time: now,
            qualified_for_permanent: false,
            qualification_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivePlaylist, QuotaRecord};
    use crate::repository::SweepAction;

    const WINDOW: i64 = 1_000;

    fn playlist(id: &str, created_at: i64, is_permanent: bool) -> ActivePlaylist {
        ActivePlaylist { id: id.to_string(), created_at, is_permanent, client_ip: "10.0.0.1".to_string() }
    }

    #[test]
    fn test_prune_window_boundary() {
        let mut record = QuotaRecord::new("alice");
        record.request_timestamps = vec![0, 1, 500, 999];
        assert_eq!(record.prune_window(1_000, WINDOW), 1);
        assert_eq!(record.request_timestamps, vec![1, 500, 999]);
    }

    #[test]
    fn test_prune_keeps_permanent_playlists() {
        let mut record = QuotaRecord::new("alice");
        record.active_playlists = vec![playlist("a", 0, false), playlist("b", 0, true), playlist("c", 900, false)];
        record.prune_playlists(1_000, WINDOW);
        let ids: Vec<&str> = record.active_playlists.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_cooldown() {
        let mut record = QuotaRecord::new("alice");
        record.request_timestamps = vec![100];
        record.disable(100);
        assert_eq!(record.cooldown_remaining(600, WINDOW), 500);
        assert!(!record.cooldown_elapsed(1_099, WINDOW));
        assert!(record.cooldown_elapsed(1_100, WINDOW));
        assert_eq!(record.refresh(1_100, WINDOW, WINDOW), SweepAction::Remove);
        assert!(!record.disabled);
        assert!(record.request_timestamps.is_empty());
    }
}
