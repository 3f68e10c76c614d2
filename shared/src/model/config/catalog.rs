use crate::error::{info_err, GatewayError};
use crate::utils::{default_catalog_refresh_mins, default_catalog_timeout_secs};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfigDto {
    /// Origin playlist, `http(s)://` url or a local file path.
    pub url: String,
    #[serde(default = "default_catalog_refresh_mins")]
    pub refresh_mins: u64,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

impl CatalogConfigDto {
    pub fn prepare(&mut self) -> Result<(), GatewayError> {
        self.url = self.url.trim().to_string();
        if self.url.is_empty() {
            return Err(info_err!("catalog.url is missing"));
        }
        if self.refresh_mins == 0 {
            self.refresh_mins = default_catalog_refresh_mins();
        }
        Ok(())
    }
}
