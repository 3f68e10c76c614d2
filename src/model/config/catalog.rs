use super::macros;
use shared::model::CatalogConfigDto;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub url: String,
    pub refresh_interval: Duration,
    pub timeout: Duration,
}

macros::from_impl!(CatalogConfig);
impl From<&CatalogConfigDto> for CatalogConfig {
    fn from(dto: &CatalogConfigDto) -> Self {
        Self {
            url: dto.url.clone(),
            refresh_interval: Duration::from_secs(dto.refresh_mins.max(1) * 60),
            timeout: Duration::from_secs(dto.timeout_secs.max(1)),
        }
    }
}
