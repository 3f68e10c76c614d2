use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenPolicy {
    Temporary { expires_at: i64, usage_cap: u32 },
    Permanent { usage_cap: u32 },
}

impl TokenPolicy {
    pub fn usage_cap(&self) -> u32 {
        match self {
            TokenPolicy::Temporary { usage_cap, .. } | TokenPolicy::Permanent { usage_cap } => *usage_cap,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, TokenPolicy::Permanent { .. })
    }

    pub fn expires_at(&self) -> Option<i64> {
        match self {
            TokenPolicy::Temporary { expires_at, .. } => Some(*expires_at),
            TokenPolicy::Permanent { .. } => None,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at().is_some_and(|exp| now > exp)
    }
}

/// Everything a redirect needs, sealed into the token. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenPayload {
    pub target_url: String,
    pub username: String,
    pub channel_id: String,
    pub issued_at: i64,
    pub nonce: u64,
    pub playlist_id: String,
    pub policy: TokenPolicy,
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageRecord {
    pub token_key: String,
    pub use_count: u32,
    pub first_used_at: i64,
    pub last_used_at: i64,
}

impl TokenUsageRecord {
    pub fn new(token_key: String, now: i64) -> Self {
        Self {
            token_key,
            use_count: 0,
            first_used_at: now,
            last_used_at: now,
        }
    }

    pub fn is_stale(&self, now: i64, retention_millis: i64) -> bool {
        now - self.last_used_at > retention_millis
    }
}
