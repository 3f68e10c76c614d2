use crate::messaging::{EventSender, GatewayEvent};
use crate::model::{ActivePlaylist, QuotaConfig, QuotaRecord, UserPlaylistHistory};
use crate::repository::StateStore;
use crate::utils::{debug_if_enabled, Clock};
use log::info;
use shared::utils::{format_duration_millis, MILLIS_PER_SECOND};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDenialReason {
    AccountDisabled,
    LimitExceeded,
    TooManyActivePlaylists,
    UserNotInGroup,
}

impl QuotaDenialReason {
    pub const fn code(self) -> &'static str {
        match self {
            QuotaDenialReason::AccountDisabled => "ACCOUNT_DISABLED",
            QuotaDenialReason::LimitExceeded => "LIMIT_EXCEEDED",
            QuotaDenialReason::TooManyActivePlaylists => "TOO_MANY_ACTIVE_PLAYLISTS",
            QuotaDenialReason::UserNotInGroup => "USER_NOT_IN_GROUP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDenied {
    pub reason: QuotaDenialReason,
    pub retry_after_millis: Option<i64>,
    pub active_playlists: u32,
    pub max_simultaneous_playlists: u32,
}

impl QuotaDenied {
    pub fn not_in_group() -> Self {
        Self {
            reason: QuotaDenialReason::UserNotInGroup,
            retry_after_millis: None,
            active_playlists: 0,
            max_simultaneous_playlists: 0,
        }
    }

    pub fn retry_after_secs(&self) -> Option<i64> {
        self.retry_after_millis.map(|millis| (millis + MILLIS_PER_SECOND - 1) / MILLIS_PER_SECOND)
    }
}

impl Display for QuotaDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            QuotaDenialReason::AccountDisabled => write!(f, "Account is temporarily disabled, try again in {}",
                                                          format_duration_millis(self.retry_after_millis.unwrap_or(0))),
            QuotaDenialReason::LimitExceeded => write!(f, "Too many playlist requests, account disabled for {}",
                                                        format_duration_millis(self.retry_after_millis.unwrap_or(0))),
            QuotaDenialReason::TooManyActivePlaylists => write!(f, "Too many active playlists ({}/{})",
                                                                 self.active_playlists, self.max_simultaneous_playlists),
            QuotaDenialReason::UserNotInGroup => write!(f, "User is not a member of the group"),
        }
    }
}

impl std::error::Error for QuotaDenied {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistGrant {
    pub playlist_id: String,
    pub is_permanent: bool,
    pub active_playlists: u32,
    pub max_simultaneous_playlists: u32,
    /// `None` for permanent users, they are not counted.
    pub requests_remaining: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub permanent: bool,
    pub disabled: bool,
    pub cooldown_remaining_millis: i64,
    pub requests_in_window: u32,
    pub active_playlists: u32,
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Sliding window quota for playlist requests with promotion to permanent access.
pub struct QuotaEngine {
    config: QuotaConfig,
    link_expiry_millis: i64,
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
    events: EventSender,
}

impl QuotaEngine {
    pub fn new(config: QuotaConfig, link_expiry_millis: i64, store: Arc<StateStore>,
               clock: Arc<dyn Clock>, events: EventSender) -> Self {
        Self { config, link_expiry_millis, store, clock, events }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Counts the request in the history and evaluates the promotion before it.
    /// Returns whether the user is permanent.
    fn record_history(&self, username: &str, now: i64) -> bool {
        let (permanent, promoted) = self.store.history().update(
            username,
            || UserPlaylistHistory::new(username, now),
            |history| {
                let mut promoted = false;
                if self.config.permanent_enabled
                    && !history.qualified_for_permanent
                    && now - history.first_request_time >= self.config.window_millis
                    && history.total_requests < u64::from(self.config.permanent_threshold) {
                    history.qualified_for_permanent = true;
                    history.qualification_time = Some(now);
                    promoted = true;
                }
                history.total_requests += 1;
                history.last_request_time = now;
                (history.qualified_for_permanent, promoted)
            });
        if promoted {
            info!("User {username} qualified for permanent access");
            self.events.send(GatewayEvent::PermanentPromotion { username: username.to_string() });
        }
        permanent
    }

    pub fn is_permanent(&self, username: &str) -> bool {
        self.store.history().read(username, |h| h.qualified_for_permanent).unwrap_or(false)
    }

    /// Decides whether `username` may fetch a new playlist from `client_ip`.
    pub fn request_playlist(&self, username: &str, client_ip: &str) -> Result<PlaylistGrant, QuotaDenied> {
        let now = self.clock.now_millis();
        let permanent = self.record_history(username, now);
        let window = self.config.window_millis;
        let max_requests = self.config.max_requests_in_window;
        let max_playlists = self.config.max_simultaneous_playlists;
        let link_expiry = self.link_expiry_millis;

        let result = self.store.quotas().update(username, || QuotaRecord::new(username), |record| {
            let denied = |record: &QuotaRecord, reason, retry_after_millis| QuotaDenied {
                reason,
                retry_after_millis,
                active_playlists: to_u32(record.active_playlists.len()),
                max_simultaneous_playlists: max_playlists,
            };

            if record.disabled && !permanent {
                if record.cooldown_elapsed(now, window) {
                    record.reactivate();
                } else {
                    let remaining = record.cooldown_remaining(now, window);
                    return Err(denied(record, QuotaDenialReason::AccountDisabled, Some(remaining)));
                }
            }

            record.prune_playlists(now, link_expiry);
            let superseded = record.active_playlists.iter().position(|p| p.client_ip == client_ip);
            if superseded.is_none() && to_u32(record.active_playlists.len()) >= max_playlists {
                return Err(denied(record, QuotaDenialReason::TooManyActivePlaylists, None));
            }

            let mut requests_remaining = None;
            if !permanent {
                record.prune_window(now, window);
                if to_u32(record.request_timestamps.len()) >= max_requests {
                    // locked until the newest granted request has left the window
                    let last_granted = record.request_timestamps.iter().copied().max().unwrap_or(now);
                    record.disable(last_granted);
                    let remaining = record.cooldown_remaining(now, window);
                    return Err(denied(record, QuotaDenialReason::LimitExceeded, Some(remaining)));
                }
                record.request_timestamps.push(now);
                requests_remaining = Some(max_requests - to_u32(record.request_timestamps.len()));
            }

            if let Some(idx) = superseded {
                record.active_playlists.remove(idx);
            }
            let playlist_id = uuid::Uuid::new_v4().to_string();
            record.active_playlists.push(ActivePlaylist {
                id: playlist_id.clone(),
                created_at: now,
                is_permanent: permanent,
                client_ip: client_ip.to_string(),
            });
            Ok(PlaylistGrant {
                playlist_id,
                is_permanent: permanent,
                active_playlists: to_u32(record.active_playlists.len()),
                max_simultaneous_playlists: max_playlists,
                requests_remaining,
            })
        });

        match &result {
            Ok(grant) => debug_if_enabled!("Granted playlist {} to {} ({}/{})", grant.playlist_id, username,
                                           grant.active_playlists, grant.max_simultaneous_playlists),
            Err(denied) if denied.reason == QuotaDenialReason::LimitExceeded => {
                info!("User {username} exceeded {max_requests} playlist requests");
                self.events.send(GatewayEvent::QuotaExceeded { username: username.to_string() });
            }
            Err(denied) => debug_if_enabled!("Playlist for {} denied: {}", username, denied.reason.code()),
        }
        result
    }

    /// True while the playlist is still among the user's active playlists.
    pub fn is_playlist_active(&self, username: &str, playlist_id: &str) -> bool {
        self.store.quotas().read(username, |r| r.has_playlist(playlist_id)).unwrap_or(false)
    }

    pub fn status(&self, username: &str) -> QuotaStatus {
        let now = self.clock.now_millis();
        let window = self.config.window_millis;
        let link_expiry = self.link_expiry_millis;
        let permanent = self.is_permanent(username);
        self.store.quotas().read(username, |record| {
            let cooldown = if record.cooldown_elapsed(now, window) { 0 } else { record.cooldown_remaining(now, window) };
            QuotaStatus {
                permanent,
                disabled: cooldown > 0,
                cooldown_remaining_millis: cooldown,
                requests_in_window: to_u32(record.request_timestamps.iter().filter(|ts| now - **ts < window).count()),
                active_playlists: to_u32(record.active_playlists.iter()
                    .filter(|p| p.is_permanent || now - p.created_at < link_expiry).count()),
            }
        }).unwrap_or(QuotaStatus {
            permanent,
            disabled: false,
            cooldown_remaining_millis: 0,
            requests_in_window: 0,
            active_playlists: 0,
        })
    }

    /// Forgets the quota state and history of a user.
    pub fn reset(&self, username: &str) {
        self.store.quotas().remove(username);
        self.store.history().remove(username);
    }

    /// Reactivates users whose cooldown passed and drops records with nothing left.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let window = self.config.window_millis;
        let link_expiry = self.link_expiry_millis;
        self.store.quotas().retain_mut(|_, record| record.refresh(now, window, link_expiry))
    }
}

#[cfg(test)]
mod tests {
    use super::{QuotaDenialReason, QuotaEngine};
    use crate::messaging::{create_event_channel, GatewayEvent};
    use crate::model::QuotaConfig;
    use crate::repository::StateStore;
    use crate::utils::ManualClock;
    use shared::utils::{hours_to_millis, mins_to_millis};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc::Receiver;

    const START: i64 = 1_700_000_000_000;

    fn quota_config(max_requests: u32, max_playlists: u32) -> QuotaConfig {
        QuotaConfig {
            window_millis: hours_to_millis(5),
            max_requests_in_window: max_requests,
            max_simultaneous_playlists: max_playlists,
            permanent_threshold: 3,
            permanent_enabled: true,
            sweep_interval: Duration::from_secs(60),
        }
    }

    fn create_engine(max_requests: u32, max_playlists: u32) -> (QuotaEngine, Arc<ManualClock>, Receiver<GatewayEvent>) {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(StateStore::new("/tmp/unused"));
        let (events, rx) = create_event_channel();
        let engine = QuotaEngine::new(quota_config(max_requests, max_playlists), mins_to_millis(120), store, clock.clone(), events);
        (engine, clock, rx)
    }

    #[test]
    fn test_alice_scenario() {
        let (engine, clock, mut rx) = create_engine(2, 3);
        assert_eq!(engine.request_playlist("alice", "10.0.0.1").unwrap().requests_remaining, Some(1));
        clock.set(START + mins_to_millis(1));
        assert_eq!(engine.request_playlist("alice", "10.0.0.1").unwrap().requests_remaining, Some(0));
        clock.set(START + mins_to_millis(2));
        let denied = engine.request_playlist("alice", "10.0.0.1").unwrap_err();
        assert_eq!(denied.reason, QuotaDenialReason::LimitExceeded);
        assert_eq!(denied.retry_after_millis, Some(hours_to_millis(5) - mins_to_millis(1)));
        assert_eq!(rx.try_recv().unwrap(), GatewayEvent::QuotaExceeded { username: "alice".to_string() });

        clock.set(START + hours_to_millis(1));
        let denied = engine.request_playlist("alice", "10.0.0.1").unwrap_err();
        assert_eq!(denied.reason, QuotaDenialReason::AccountDisabled);
        assert_eq!(denied.retry_after_millis, Some(hours_to_millis(4) + mins_to_millis(1)));

        clock.set(START + hours_to_millis(5) + mins_to_millis(1));
        let grant = engine.request_playlist("alice", "10.0.0.1").unwrap();
        assert!(!grant.is_permanent);
        // window was reset
        assert_eq!(grant.requests_remaining, Some(1));
    }

    #[test]
    fn test_burst_at_window_end_stays_locked() {
        let (engine, clock, _rx) = create_engine(2, 10);
        let window = hours_to_millis(5);
        let mut granted = Vec::new();
        for at in [0, mins_to_millis(299), mins_to_millis(299) + 1_000, window + 1_000, window + 2_000,
                   mins_to_millis(299) + window, mins_to_millis(299) + window + 1_000] {
            clock.set(START + at);
            if engine.request_playlist("ivan", &format!("10.0.0.{}", granted.len())).is_ok() {
                granted.push(at);
            }
        }
        assert_eq!(granted, vec![0, mins_to_millis(299), mins_to_millis(299) + window, mins_to_millis(299) + window + 1_000]);
        for (idx, first) in granted.iter().enumerate() {
            let in_window = granted[idx..].iter().filter(|at| **at - first < window).count();
            assert!(in_window <= 2, "{in_window} grants within one window starting at {first}");
        }
    }

    #[test]
    fn test_window_slides() {
        let (engine, clock, _rx) = create_engine(3, 10);
        for minute in 0..3 {
            clock.set(START + mins_to_millis(minute * 60));
            assert!(engine.request_playlist("carol", &format!("10.0.0.{minute}")).is_ok());
        }
        // first request left the window
        clock.set(START + hours_to_millis(5));
        assert!(engine.request_playlist("carol", "10.0.0.9").is_ok());
        assert_eq!(engine.status("carol").requests_in_window, 3);
    }

    #[test]
    fn test_promotion_is_monotonic() {
        let (engine, clock, mut rx) = create_engine(2, 3);
        assert!(!engine.request_playlist("dave", "10.0.0.1").unwrap().is_permanent);
        clock.advance(hours_to_millis(5));
        let grant = engine.request_playlist("dave", "10.0.0.1").unwrap();
        assert!(grant.is_permanent);
        assert!(grant.requests_remaining.is_none());
        assert_eq!(rx.try_recv().unwrap(), GatewayEvent::PermanentPromotion { username: "dave".to_string() });

        // bursts far above the window limit never demote
        for _ in 0..20 {
            clock.advance(1_000);
            assert!(engine.request_playlist("dave", "10.0.0.1").unwrap().is_permanent);
        }
        assert!(engine.is_permanent("dave"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_heavy_user_is_not_promoted() {
        let (engine, clock, _rx) = create_engine(10, 10);
        for _ in 0..3 {
            assert!(engine.request_playlist("erin", "10.0.0.1").is_ok());
        }
        clock.advance(hours_to_millis(6));
        assert!(!engine.request_playlist("erin", "10.0.0.1").unwrap().is_permanent);
    }

    #[test]
    fn test_active_playlist_cap() {
        let (engine, clock, _rx) = create_engine(10, 2);
        assert!(engine.request_playlist("frank", "10.0.0.1").is_ok());
        assert!(engine.request_playlist("frank", "10.0.0.2").is_ok());
        let denied = engine.request_playlist("frank", "10.0.0.3").unwrap_err();
        assert_eq!(denied.reason, QuotaDenialReason::TooManyActivePlaylists);
        assert_eq!((denied.active_playlists, denied.max_simultaneous_playlists), (2, 2));

        // same device replaces its own playlist
        let old = engine.store.quotas().get("frank").unwrap().active_playlists[0].id.clone();
        let grant = engine.request_playlist("frank", "10.0.0.1").unwrap();
        assert_eq!(grant.active_playlists, 2);
        assert!(!engine.is_playlist_active("frank", &old));
        assert!(engine.is_playlist_active("frank", &grant.playlist_id));

        // temporary playlists expire with the links
        clock.advance(mins_to_millis(121));
        assert!(engine.request_playlist("frank", "10.0.0.3").is_ok());
    }

    #[test]
    fn test_quiet_sweep_keeps_store_clean() {
        let (engine, clock, _rx) = create_engine(3, 3);
        assert!(engine.request_playlist("jack", "10.0.0.1").is_ok());
        assert!(engine.store.quotas().take_snapshot().is_some());
        clock.advance(1_000);
        assert_eq!(engine.sweep(), 0);
        assert!(!engine.store.quotas().is_dirty());
    }

    #[test]
    fn test_sweep_and_reset() {
        let (engine, clock, _rx) = create_engine(1, 3);
        assert!(engine.request_playlist("gina", "10.0.0.1").is_ok());
        assert!(engine.request_playlist("gina", "10.0.0.1").is_err());
        assert!(engine.status("gina").disabled);
        clock.advance(hours_to_millis(5) + 1);
        assert_eq!(engine.sweep(), 1);
        assert!(!engine.status("gina").disabled);

        assert!(engine.request_playlist("hank", "10.0.0.1").is_ok());
        engine.reset("hank");
        assert_eq!(engine.status("hank").active_playlists, 0);
        assert!(engine.store.history().get("hank").is_none());
    }
}
