use serde::{Deserialize, Serialize};
use crate::utils::is_blank_optional_string;

/// Json body of every rejected gateway request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponseDto {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl ErrorResponseDto {
    pub fn new(error: &str, message: String) -> Self {
        Self {
            error: error.to_string(),
            message,
            retry_after_secs: None,
            current: None,
            max: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatusDto {
    pub username: String,
    pub permanent: bool,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_secs: Option<i64>,
    pub requests_in_window: u32,
    pub max_requests_in_window: u32,
    /// Missing for permanent users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_remaining: Option<u32>,
    pub active_playlists: u32,
    pub max_simultaneous_playlists: u32,
    pub active_devices: u32,
    pub max_devices: u32,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Config,
    Issued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialDto {
    pub username: String,
    pub enabled: bool,
    pub source: CredentialSource,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub max_connections: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_telegram_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IssueCredentialRequestDto {
    pub username: String,
    /// Generated when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_hours: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCredentialResponseDto {
    pub credential: CredentialDto,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthcheckDto {
    pub status: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "is_blank_optional_string")]
    pub build_time: Option<String>,
    pub server_time: String,
}
