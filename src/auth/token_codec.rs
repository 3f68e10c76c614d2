use crate::model::{AccessTokenPayload, TokenConfig, TokenPolicy, TokenUsageRecord};
use crate::repository::StateStore;
use crate::utils::crypto_utils::{open, random_bytes, seal, SealKeys};
use crate::utils::{debug_if_enabled, Clock};
use shared::error::{info_err, GatewayError};
use shared::utils::{encode_base64_hash, sanitize_sensitive_info};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    Malformed,
    Expired,
    UserMismatch,
    IpMismatch,
    UsageLimit,
}

impl TokenErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            TokenErrorKind::Malformed => "MALFORMED",
            TokenErrorKind::Expired => "EXPIRED",
            TokenErrorKind::UserMismatch => "USER_MISMATCH",
            TokenErrorKind::IpMismatch => "IP_MISMATCH",
            TokenErrorKind::UsageLimit => "USAGE_LIMIT",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            TokenErrorKind::Malformed => "Invalid token",
            TokenErrorKind::Expired => "Link has expired, please refresh your playlist",
            TokenErrorKind::UserMismatch => "Token belongs to another user",
            TokenErrorKind::IpMismatch => "Token was issued for another client",
            TokenErrorKind::UsageLimit => "Link usage limit reached, please refresh your playlist",
        }
    }
}

impl Display for TokenErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::error::Error for TokenErrorKind {}

/// Identifies the usage counter of one token for one user.
pub fn token_usage_key(username: &str, token: &str) -> String {
    encode_base64_hash(&format!("{username}\u{1f}{token}"))
}

/// Issues and verifies sealed redirect tokens.
///
/// The token itself is stateless, only its usage counter lives in the store.
pub struct TokenCodec {
    keys: SealKeys,
    config: TokenConfig,
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &str, config: TokenConfig, store: Arc<StateStore>, clock: Arc<dyn Clock>) -> Result<Self, GatewayError> {
        Ok(Self {
            keys: SealKeys::derive(secret)?,
            config,
            store,
            clock,
        })
    }

    pub fn ip_binding(&self) -> bool {
        self.config.ip_binding
    }

    /// Builds the payload for one channel of a freshly granted playlist.
    pub fn new_payload(&self, username: &str, channel_id: &str, target_url: &str,
                       playlist_id: &str, permanent: bool, client_ip: &str) -> AccessTokenPayload {
        let now = self.clock.now_millis();
        let policy = if permanent {
            TokenPolicy::Permanent { usage_cap: self.config.permanent_usage_cap }
        } else {
            TokenPolicy::Temporary {
                expires_at: now + self.config.link_expiry_millis,
                usage_cap: self.config.usage_limit,
            }
        };
        AccessTokenPayload {
            target_url: target_url.to_string(),
            username: username.to_string(),
            channel_id: channel_id.to_string(),
            issued_at: now,
            nonce: u64::from_le_bytes(random_bytes()),
            playlist_id: playlist_id.to_string(),
            policy,
            client_ip: self.config.ip_binding.then(|| client_ip.to_string()),
        }
    }

    pub fn issue(&self, payload: &AccessTokenPayload) -> Result<String, GatewayError> {
        let plain = rmp_serde::to_vec(payload).map_err(|err| info_err!("Failed to serialize token: {err}"))?;
        seal(&self.keys, &plain)
    }

    fn decode(&self, token: &str) -> Result<AccessTokenPayload, TokenErrorKind> {
        let plain = open(&self.keys, token).map_err(|err| {
            debug_if_enabled!("Rejected token {}: {}", sanitize_sensitive_info(token), err);
            TokenErrorKind::Malformed
        })?;
        rmp_serde::from_slice::<AccessTokenPayload>(&plain).map_err(|_| TokenErrorKind::Malformed)
    }

    /// Runs every check except the usage limit, nothing is counted.
    pub fn inspect(&self, token: &str, username: &str, client_ip: &str) -> Result<AccessTokenPayload, TokenErrorKind> {
        let payload = self.decode(token)?;
        if payload.policy.is_expired(self.clock.now_millis()) {
            return Err(TokenErrorKind::Expired);
        }
        if payload.username != username {
            return Err(TokenErrorKind::UserMismatch);
        }
        if self.config.ip_binding && payload.client_ip.as_deref() != Some(client_ip) {
            return Err(TokenErrorKind::IpMismatch);
        }
        Ok(payload)
    }

    /// Full verification. A successful call consumes one use of the token.
    pub fn verify(&self, token: &str, username: &str, client_ip: &str) -> Result<AccessTokenPayload, TokenErrorKind> {
        let payload = self.inspect(token, username, client_ip)?;
        self.record_use(token, &payload)?;
        Ok(payload)
    }

    /// Fails with `UsageLimit` when no use is left, nothing is counted.
    pub fn check_usage(&self, token: &str, payload: &AccessTokenPayload) -> Result<(), TokenErrorKind> {
        if self.usage_count(&payload.username, token) >= payload.policy.usage_cap() {
            Err(TokenErrorKind::UsageLimit)
        } else {
            Ok(())
        }
    }

    /// Counts one use of an inspected token, atomically against its cap.
    pub fn record_use(&self, token: &str, payload: &AccessTokenPayload) -> Result<(), TokenErrorKind> {
        let usage_cap = payload.policy.usage_cap();
        let now = self.clock.now_millis();
        let key = token_usage_key(&payload.username, token);
        self.store.token_usage().update(&key, || TokenUsageRecord::new(key.clone(), now), |record| {
            if record.use_count >= usage_cap {
                Err(TokenErrorKind::UsageLimit)
            } else {
                record.use_count += 1;
                record.last_used_at = now;
                Ok(())
            }
        })
    }

    pub fn usage_count(&self, username: &str, token: &str) -> u32 {
        self.store.token_usage().read(&token_usage_key(username, token), |r| r.use_count).unwrap_or(0)
    }

    /// Drops usage counters not touched within the retention window.
    pub fn sweep_usage(&self) -> usize {
        let now = self.clock.now_millis();
        let retention = self.config.usage_retention_millis;
        self.store.token_usage().retain(|_, record| !record.is_stale(now, retention))
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenCodec, TokenErrorKind};
    use crate::model::{TokenConfig, TokenPolicy};
    use crate::repository::StateStore;
    use crate::utils::crypto_utils::{decode_base64_string, encode_base64_string};
    use crate::utils::ManualClock;
    use shared::utils::{hours_to_millis, mins_to_millis};
    use std::sync::Arc;
    use std::time::Duration;

    const START: i64 = 1_700_000_000_000;
    const SECRET: &str = "0123456789abcdef0123";

    fn token_config(ip_binding: bool, usage_limit: u32) -> TokenConfig {
        TokenConfig {
            ip_binding,
            usage_limit,
            permanent_usage_cap: usage_limit * 10,
            link_expiry_millis: mins_to_millis(120),
            usage_retention_millis: hours_to_millis(48),
            sweep_interval: Duration::from_secs(60),
        }
    }

    fn create_codec(ip_binding: bool, usage_limit: u32) -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(StateStore::new("/tmp/unused"));
        let codec = TokenCodec::new(SECRET, token_config(ip_binding, usage_limit), store, clock.clone()).unwrap();
        (codec, clock)
    }

    fn issue(codec: &TokenCodec, permanent: bool) -> (String, crate::model::AccessTokenPayload) {
        let payload = codec.new_payload("alice", "ch1", "http://origin/live/1.ts", "pl1", permanent, "10.0.0.1");
        (codec.issue(&payload).unwrap(), payload)
    }

    #[test]
    fn test_verify_returns_payload() {
        let (codec, _) = create_codec(false, 5);
        let (token, payload) = issue(&codec, false);
        let verified = codec.verify(&token, "alice", "192.168.1.1").unwrap();
        assert_eq!(verified, payload);
        assert!(verified.client_ip.is_none());
        assert_eq!(codec.usage_count("alice", &token), 1);
    }

    #[test]
    fn test_tokens_are_unique() {
        let (codec, _) = create_codec(false, 5);
        let (first, p1) = issue(&codec, false);
        let (second, p2) = issue(&codec, false);
        assert_ne!(first, second);
        assert_ne!(p1.nonce, p2.nonce);
    }

    #[test]
    fn test_any_flipped_byte_is_malformed() {
        let (codec, _) = create_codec(false, 1_000);
        let (token, _) = issue(&codec, false);
        let raw = decode_base64_string(&token).unwrap();
        for idx in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[idx] ^= 0x80;
            let result = codec.verify(&encode_base64_string(&tampered), "alice", "10.0.0.1");
            assert_eq!(result, Err(TokenErrorKind::Malformed), "byte {idx}");
        }
        assert_eq!(codec.verify("garbage", "alice", "10.0.0.1"), Err(TokenErrorKind::Malformed));
        assert_eq!(codec.verify("", "alice", "10.0.0.1"), Err(TokenErrorKind::Malformed));
    }

    #[test]
    fn test_temporary_token_expiry() {
        let (codec, clock) = create_codec(false, 5);
        let (token, payload) = issue(&codec, false);
        assert_eq!(payload.policy, TokenPolicy::Temporary { expires_at: START + mins_to_millis(120), usage_cap: 5 });

        clock.set(START + mins_to_millis(119));
        assert!(codec.verify(&token, "alice", "10.0.0.1").is_ok());
        clock.set(START + mins_to_millis(121));
        assert_eq!(codec.verify(&token, "alice", "10.0.0.1"), Err(TokenErrorKind::Expired));
    }

    #[test]
    fn test_permanent_token_never_expires() {
        let (codec, clock) = create_codec(false, 5);
        let (token, payload) = issue(&codec, true);
        assert_eq!(payload.policy, TokenPolicy::Permanent { usage_cap: 50 });
        clock.advance(hours_to_millis(24 * 365));
        assert!(codec.verify(&token, "alice", "10.0.0.1").is_ok());
    }

    #[test]
    fn test_check_order() {
        let (codec, clock) = create_codec(true, 1);
        let (token, _) = issue(&codec, false);
        assert_eq!(codec.verify(&token, "bob", "10.0.0.1"), Err(TokenErrorKind::UserMismatch));
        assert_eq!(codec.verify(&token, "alice", "10.0.0.2"), Err(TokenErrorKind::IpMismatch));
        // a user mismatch is reported before the ip mismatch
        assert_eq!(codec.verify(&token, "bob", "10.0.0.2"), Err(TokenErrorKind::UserMismatch));
        assert!(codec.verify(&token, "alice", "10.0.0.1").is_ok());
        assert_eq!(codec.verify(&token, "alice", "10.0.0.1"), Err(TokenErrorKind::UsageLimit));
        // expiry wins over everything but a broken token
        clock.advance(mins_to_millis(121));
        assert_eq!(codec.verify(&token, "bob", "10.0.0.2"), Err(TokenErrorKind::Expired));
    }

    #[test]
    fn test_usage_limit() {
        let (codec, _) = create_codec(false, 3);
        let (token, _) = issue(&codec, false);
        for _ in 0..3 {
            assert!(codec.verify(&token, "alice", "10.0.0.1").is_ok());
        }
        assert_eq!(codec.verify(&token, "alice", "10.0.0.1"), Err(TokenErrorKind::UsageLimit));
        assert_eq!(codec.usage_count("alice", &token), 3);
        // inspect does not count
        let payload = codec.inspect(&token, "alice", "10.0.0.1").unwrap();
        assert_eq!(codec.usage_count("alice", &token), 3);
        assert_eq!(codec.check_usage(&token, &payload), Err(TokenErrorKind::UsageLimit));
    }

    #[test]
    fn test_check_usage_counts_nothing() {
        let (codec, _) = create_codec(false, 1);
        let (token, _) = issue(&codec, false);
        let payload = codec.inspect(&token, "alice", "10.0.0.1").unwrap();
        assert_eq!(codec.check_usage(&token, &payload), Ok(()));
        assert_eq!(codec.check_usage(&token, &payload), Ok(()));
        assert_eq!(codec.usage_count("alice", &token), 0);
        assert_eq!(codec.record_use(&token, &payload), Ok(()));
        assert_eq!(codec.record_use(&token, &payload), Err(TokenErrorKind::UsageLimit));
    }

    #[test]
    fn test_concurrent_verify_respects_cap() {
        let (codec, _) = create_codec(false, 10);
        let codec = Arc::new(codec);
        let (token, _) = issue(&codec, false);
        let handles: Vec<_> = (0..4).map(|_| {
            let codec = Arc::clone(&codec);
            let token = token.clone();
            std::thread::spawn(move || {
                (0..10).filter(|_| codec.verify(&token, "alice", "10.0.0.1").is_ok()).count()
            })
        }).collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 10);
    }

    #[test]
    fn test_token_survives_restart() {
        let (codec, _) = create_codec(false, 5);
        let (token, payload) = issue(&codec, false);
        let (restarted, _) = create_codec(false, 5);
        assert_eq!(restarted.inspect(&token, "alice", "10.0.0.1"), Ok(payload));
    }

    #[test]
    fn test_sweep_usage() {
        let (codec, clock) = create_codec(false, 5);
        let (token, _) = issue(&codec, true);
        assert!(codec.verify(&token, "alice", "10.0.0.1").is_ok());
        clock.advance(hours_to_millis(47));
        assert_eq!(codec.sweep_usage(), 0);
        clock.advance(hours_to_millis(2));
        assert_eq!(codec.sweep_usage(), 1);
        assert_eq!(codec.usage_count("alice", &token), 0);
    }
}
