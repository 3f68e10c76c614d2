use std::collections::HashSet;
use crate::error::{info_err, GatewayError};
use crate::model::{AdminConfigDto, CatalogConfigDto, ConcurrencyConfigDto, ConfigApiDto, CredentialConfigDto,
                   CredentialPolicyConfigDto, GroupCheckConfigDto, LogConfigDto, MessagingConfigDto,
                   PersistenceConfigDto, QuotaConfigDto, RateLimitConfigDto, TokenConfigDto};
use crate::utils::default_storage_dir;

const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDto {
    #[serde(default)]
    pub api: ConfigApiDto,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Secret the token keys are derived from. Changing it invalidates all issued tokens.
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfigDto>,
    #[serde(default)]
    pub token: TokenConfigDto,
    #[serde(default)]
    pub quota: QuotaConfigDto,
    #[serde(default)]
    pub concurrency: ConcurrencyConfigDto,
    #[serde(default)]
    pub persistence: PersistenceConfigDto,
    pub catalog: CatalogConfigDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_check: Option<GroupCheckConfigDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging: Option<MessagingConfigDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminConfigDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfigDto>,
    #[serde(default)]
    pub credential_policy: CredentialPolicyConfigDto,
    #[serde(default)]
    pub credentials: Vec<CredentialConfigDto>,
}

impl ConfigDto {
    pub fn prepare(&mut self) -> Result<(), GatewayError> {
        self.secret = self.secret.trim().to_string();
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(info_err!("secret must have at least {MIN_SECRET_LEN} characters"));
        }
        self.storage_dir = self.storage_dir.trim().to_string();
        if self.storage_dir.is_empty() {
            self.storage_dir = default_storage_dir();
        }
        self.api.prepare()?;
        self.token.prepare()?;
        self.quota.prepare()?;
        self.catalog.prepare()?;
        if let Some(log) = self.log.as_mut() {
            log.clean();
        }
        if let Some(admin) = self.admin.as_mut() {
            admin.prepare()?;
        }
        self.prepare_credentials()
    }

    fn prepare_credentials(&mut self) -> Result<(), GatewayError> {
        let mut usernames = HashSet::new();
        for credential in &mut self.credentials {
            credential.username = credential.username.trim().to_string();
            if credential.username.is_empty() || credential.password.is_empty() {
                return Err(info_err!("credentials need a username and a password"));
            }
            if !usernames.insert(credential.username.clone()) {
                return Err(info_err!("Duplicate username in credentials: {}", credential.username));
            }
        }
        Ok(())
    }
}
