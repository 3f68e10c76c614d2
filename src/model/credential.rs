use serde::{Deserialize, Serialize};
use shared::model::{CredentialDto, CredentialSource};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    /// argon2 encoded hash, plain text only for config defined users
    pub password: String,
    pub enabled: bool,
    pub source: CredentialSource,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_telegram_id: Option<i64>,
    /// 0 means the configured default device cap
    #[serde(default)]
    pub max_connections: u32,
    #[serde(default)]
    pub expiry_notified: bool,
}

impl Credential {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn device_cap(&self, default_cap: u32) -> u32 {
        if self.max_connections == 0 { default_cap } else { self.max_connections }
    }

    pub fn to_dto(&self) -> CredentialDto {
        CredentialDto {
            username: self.username.clone(),
            enabled: self.enabled,
            source: self.source,
            created_at: self.created_at,
            expires_at: self.expires_at,
            max_connections: self.max_connections,
            source_telegram_id: self.source_telegram_id,
        }
    }
}
