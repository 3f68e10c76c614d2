use crate::error::{info_err, GatewayError};
use crate::utils::{default_as_false, default_host, default_port, get_trimmed_string, trim_slash};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigApiDto {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base url written into playlists, e.g. `https://tv.example.org`.
    /// When missing, the `Host` header of the playlist request is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    /// Take the client address from `X-Real-IP`/`X-Forwarded-*`. Only enable
    /// behind a reverse proxy which overwrites these headers.
    #[serde(default = "default_as_false")]
    pub trust_forwarded_headers: bool,
}

impl Default for ConfigApiDto {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            trust_forwarded_headers: default_as_false(),
        }
    }
}

impl ConfigApiDto {
    pub fn prepare(&mut self) -> Result<(), GatewayError> {
        if self.port == 0 {
            return Err(info_err!("api.port must not be 0"));
        }
        self.public_url = get_trimmed_string(self.public_url.as_deref()).map(|url| trim_slash(&url).to_string());
        if let Some(url) = self.public_url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(info_err!("api.public_url must start with http:// or https://: {url}"));
            }
        }
        Ok(())
    }
}
