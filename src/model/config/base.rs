use super::macros;
use crate::model::{CatalogConfig, ConcurrencyConfig, CredentialPolicyConfig, PersistenceConfig, QuotaConfig, TokenConfig};
use crate::repository::RetentionPolicy;
use shared::model::{AdminConfigDto, ConfigApiDto, ConfigDto, CredentialConfigDto, GroupCheckConfigDto,
                    LogConfigDto, MessagingConfigDto, RateLimitConfigDto};

/// Runtime configuration, durations converted to milliseconds.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ConfigApiDto,
    pub storage_dir: String,
    pub secret: String,
    pub log: Option<LogConfigDto>,
    pub token: TokenConfig,
    pub quota: QuotaConfig,
    pub concurrency: ConcurrencyConfig,
    pub persistence: PersistenceConfig,
    pub catalog: CatalogConfig,
    pub group_check: Option<GroupCheckConfigDto>,
    pub messaging: Option<MessagingConfigDto>,
    pub admin: Option<AdminConfigDto>,
    pub rate_limit: Option<RateLimitConfigDto>,
    pub credential_policy: CredentialPolicyConfig,
    pub credentials: Vec<CredentialConfigDto>,
}

impl Config {
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            window_millis: self.quota.window_millis,
            link_expiry_millis: self.token.link_expiry_millis,
            token_usage_retention_millis: self.token.usage_retention_millis,
            inactivity_timeout_millis: self.concurrency.inactivity_timeout_millis,
        }
    }
}

macros::from_impl!(Config);
impl From<&ConfigDto> for Config {
    fn from(dto: &ConfigDto) -> Self {
        Self {
            api: dto.api.clone(),
            storage_dir: dto.storage_dir.clone(),
            secret: dto.secret.clone(),
            log: dto.log.clone(),
            token: TokenConfig::from(&dto.token),
            quota: QuotaConfig::from(&dto.quota),
            concurrency: ConcurrencyConfig::from(&dto.concurrency),
            persistence: PersistenceConfig::from(&dto.persistence),
            catalog: CatalogConfig::from(&dto.catalog),
            group_check: dto.group_check.clone(),
            messaging: dto.messaging.clone(),
            admin: dto.admin.clone(),
            rate_limit: dto.rate_limit.clone(),
            credential_policy: CredentialPolicyConfig::from(&dto.credential_policy),
            credentials: dto.credentials.clone(),
        }
    }
}
