use crate::catalog::parse_m3u;
use crate::model::{CatalogConfig, Channel};
use crate::utils::request::is_http_url;
use arc_swap::ArcSwap;
use log::{info, warn};
use shared::error::{info_err, notify_err, GatewayError};
use shared::utils::sanitize_sensitive_info;
use std::sync::Arc;

/// Channel list of the origin playlist. Readers get a snapshot, a failed
/// refresh keeps the last good list.
pub struct ChannelCatalog {
    config: CatalogConfig,
    client: reqwest::Client,
    channels: ArcSwap<Vec<Channel>>,
}

impl ChannelCatalog {
    pub fn new(config: CatalogConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            channels: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn get_channels(&self) -> Arc<Vec<Channel>> {
        self.channels.load_full()
    }

    pub fn set_channels(&self, channels: Vec<Channel>) {
        self.channels.store(Arc::new(channels));
    }

    async fn download(&self) -> Result<String, GatewayError> {
        let url = self.config.url.as_str();
        if is_http_url(url) {
            let response = self.client.get(url)
                .timeout(self.config.timeout)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|err| info_err!("Failed to download catalog {}: {}", sanitize_sensitive_info(url), err.without_url()))?;
            response.text().await
                .map_err(|err| info_err!("Failed to read catalog {}: {}", sanitize_sensitive_info(url), err.without_url()))
        } else {
            tokio::fs::read_to_string(url).await
                .map_err(|err| info_err!("Failed to read catalog file {url}: {err}"))
        }
    }

    /// Reloads the origin playlist. Returns the number of channels.
    pub async fn refresh(&self) -> Result<usize, GatewayError> {
        let content = self.download().await?;
        let channels = parse_m3u(&content);
        if channels.is_empty() {
            let kept = self.channels.load().len();
            warn!("Catalog {} contains no channels, keeping {kept} cached channels", sanitize_sensitive_info(&self.config.url));
            return Err(notify_err!("Catalog refresh returned no channels"));
        }
        let count = channels.len();
        self.set_channels(channels);
        info!("Catalog loaded with {count} channels");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::ChannelCatalog;
    use crate::model::CatalogConfig;
    use std::io::Write;
    use std::time::Duration;

    fn create_catalog(url: &str) -> ChannelCatalog {
        let config = CatalogConfig {
            url: url.to_string(),
            refresh_interval: Duration::from_secs(3600),
            timeout: Duration::from_secs(1),
        };
        ChannelCatalog::new(config, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_refresh_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#EXTM3U\n#EXTINF:-1 tvg-id=\"one\",One\nhttp://origin/1.ts\n#EXTINF:-1,Two\nhttp://origin/2.ts").unwrap();
        let catalog = create_catalog(&file.path().to_string_lossy());
        assert_eq!(catalog.refresh().await.unwrap(), 2);
        let channels = catalog.get_channels();
        assert_eq!(channels[0].id, "one");
        assert_eq!(channels[1].name, "Two");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#EXTM3U\n#EXTINF:-1,One\nhttp://origin/1.ts").unwrap();
        let catalog = create_catalog(&file.path().to_string_lossy());
        assert_eq!(catalog.refresh().await.unwrap(), 1);

        std::fs::write(file.path(), "#EXTM3U\n").unwrap();
        assert!(catalog.refresh().await.is_err());
        assert_eq!(catalog.get_channels().len(), 1);

        let missing = create_catalog("/nonexistent/tulipgate/catalog.m3u");
        assert!(missing.refresh().await.is_err());
        assert!(missing.get_channels().is_empty());
    }
}
