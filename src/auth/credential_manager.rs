use crate::auth::{generate_password, hash_password, verify_password_async};
use crate::messaging::{EventSender, GatewayEvent};
use crate::model::{Credential, CredentialPolicyConfig};
use crate::repository::StateStore;
use crate::utils::Clock;
use log::{info, warn};
use shared::error::GatewayError;
use shared::model::{CredentialConfigDto, CredentialDto, CredentialSource};
use shared::utils::{MILLIS_PER_HOUR, MILLIS_PER_SECOND};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    UnknownUser,
    InvalidPassword,
    Disabled,
    Expired,
}

impl AuthFailure {
    pub const fn code(self) -> &'static str {
        "AUTH_FAILED"
    }
}

impl Display for AuthFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            AuthFailure::UnknownUser | AuthFailure::InvalidPassword => "invalid username or password",
            AuthFailure::Disabled => "account is disabled",
            AuthFailure::Expired => "account has expired",
        };
        write!(f, "{reason}")
    }
}

impl std::error::Error for AuthFailure {}

#[derive(Debug)]
pub enum CredentialError {
    InvalidUsername(String),
    AlreadyExists(String),
    NotFound(String),
    ConfigManaged(String),
    Internal(GatewayError),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::InvalidUsername(name) => write!(f, "Invalid username: {name}"),
            CredentialError::AlreadyExists(name) => write!(f, "Username {name} is already taken"),
            CredentialError::NotFound(name) => write!(f, "Unknown user {name}"),
            CredentialError::ConfigManaged(name) => write!(f, "User {name} is defined in the config file"),
            CredentialError::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CredentialError {}

#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    pub expires_in_millis: Option<i64>,
    pub telegram_id: Option<i64>,
    pub max_connections: u32,
}

/// Result of one expiry sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExpirySweep {
    pub disabled: Vec<String>,
    pub warned: Vec<String>,
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
}

pub struct CredentialManager {
    policy: CredentialPolicyConfig,
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
    events: EventSender,
}

impl CredentialManager {
    pub fn new(policy: CredentialPolicyConfig, store: Arc<StateStore>, clock: Arc<dyn Clock>, events: EventSender) -> Self {
        Self { policy, store, clock, events }
    }

    /// Makes the stored config users match the config file. Config users win
    /// over issued users with the same name.
    pub fn sync_config_credentials(&self, credentials: &[CredentialConfigDto]) -> usize {
        let now = self.clock.now_millis();
        let names: HashSet<&str> = credentials.iter().map(|c| c.username.as_str()).collect();
        self.store.credentials().retain(|username, c| c.source != CredentialSource::Config || names.contains(username));

        for dto in credentials {
            let expires_at = dto.exp_date.map(|secs| secs.saturating_mul(MILLIS_PER_SECOND));
            let previous = self.store.credentials().get(&dto.username);
            if previous.as_ref().is_some_and(|c| c.source == CredentialSource::Issued) {
                warn!("Config user {} replaces an issued credential with the same name", dto.username);
            }
            let credential = Credential {
                username: dto.username.clone(),
                password: dto.password.clone(),
                enabled: true,
                source: CredentialSource::Config,
                created_at: previous.as_ref().map_or(now, |c| c.created_at),
                expires_at,
                source_telegram_id: dto.telegram_id,
                max_connections: dto.max_connections,
                expiry_notified: previous.is_some_and(|c| c.expiry_notified && c.expires_at == expires_at),
            };
            self.store.credentials().insert(&dto.username, credential);
        }
        credentials.len()
    }

    /// Creates a new credential. Returns it with the plain password, which is not stored.
    pub fn issue(&self, username: &str, password: Option<&str>, options: &IssueOptions) -> Result<(Credential, String), CredentialError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(CredentialError::InvalidUsername(username.to_string()));
        }
        if self.store.credentials().contains_key(username) {
            return Err(CredentialError::AlreadyExists(username.to_string()));
        }
        let plain = password.map(str::trim).filter(|p| !p.is_empty()).map_or_else(generate_password, ToString::to_string);
        let now = self.clock.now_millis();
        let credential = Credential {
            username: username.to_string(),
            password: hash_password(&plain).map_err(CredentialError::Internal)?,
            enabled: true,
            source: CredentialSource::Issued,
            created_at: now,
            expires_at: options.expires_in_millis.or(self.policy.default_validity_millis).map(|millis| now + millis),
            source_telegram_id: options.telegram_id,
            max_connections: options.max_connections,
            expiry_notified: false,
        };
        // hashing takes a while, someone may have taken the name meanwhile
        if !self.store.credentials().insert_if_absent(username, credential.clone()) {
            return Err(CredentialError::AlreadyExists(username.to_string()));
        }
        info!("Issued credential for {username}");
        Ok((credential, plain))
    }

    /// Deletes an issued credential. Config users can only be removed from the config file.
    pub fn revoke(&self, username: &str) -> Result<Credential, CredentialError> {
        match self.store.credentials().read(username, |c| c.source) {
            None => Err(CredentialError::NotFound(username.to_string())),
            Some(CredentialSource::Config) => Err(CredentialError::ConfigManaged(username.to_string())),
            Some(CredentialSource::Issued) => {
                let removed = self.store.credentials()
                    .remove_if(username, |c| c.source == CredentialSource::Issued)
                    .ok_or_else(|| CredentialError::NotFound(username.to_string()))?;
                info!("Revoked credential of {username}");
                Ok(removed)
            }
        }
    }

    /// Looks up an active credential without a password, used for redirects.
    pub fn active_credential(&self, username: &str) -> Result<Credential, AuthFailure> {
        let credential = self.store.credentials().get(username).ok_or(AuthFailure::UnknownUser)?;
        if !credential.enabled {
            return Err(AuthFailure::Disabled);
        }
        if credential.is_expired(self.clock.now_millis()) {
            return Err(AuthFailure::Expired);
        }
        Ok(credential)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Credential, AuthFailure> {
        let credential = self.store.credentials().get(username).ok_or(AuthFailure::UnknownUser)?;
        if !verify_password_async(password, &credential.password).await {
            return Err(AuthFailure::InvalidPassword);
        }
        self.active_credential(username)
    }

    pub fn list(&self) -> Vec<CredentialDto> {
        let mut list: Vec<CredentialDto> = self.store.credentials().values().iter().map(Credential::to_dto).collect();
        list.sort_by(|a, b| a.username.cmp(&b.username));
        list
    }

    /// Disables expired credentials and warns once about credentials expiring soon.
    pub fn sweep_expiry(&self) -> ExpirySweep {
        let now = self.clock.now_millis();
        let warn_until = now + self.policy.expiry_warning_millis;
        let mut sweep = ExpirySweep::default();

        for credential in self.store.credentials().values() {
            let Some(expires_at) = credential.expires_at else { continue };
            if !credential.enabled {
                continue;
            }
            let username = credential.username.as_str();
            if expires_at <= now {
                let disabled = self.store.credentials().update_existing(username, |c| {
                    let changed = c.enabled && c.is_expired(now);
                    if changed {
                        c.enabled = false;
                    }
                    changed
                });
                if disabled == Some(true) {
                    info!("Credential of {username} expired and was disabled");
                    sweep.disabled.push(username.to_string());
                }
            } else if expires_at <= warn_until && !credential.expiry_notified {
                let notify = self.store.credentials().update_existing(username, |c| !std::mem::replace(&mut c.expiry_notified, true));
                if notify == Some(true) {
                    let hours_left = u64::try_from((expires_at - now + MILLIS_PER_HOUR - 1) / MILLIS_PER_HOUR).unwrap_or(0);
                    self.events.send(GatewayEvent::CredentialExpiringSoon { username: username.to_string(), hours_left });
                    sweep.warned.push(username.to_string());
                }
            }
        }
        sweep
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthFailure, CredentialError, CredentialManager, IssueOptions};
    use crate::messaging::{create_event_channel, GatewayEvent};
    use crate::model::CredentialPolicyConfig;
    use crate::repository::StateStore;
    use crate::utils::ManualClock;
    use shared::model::{CredentialConfigDto, CredentialSource};
    use shared::utils::{hours_to_millis, MILLIS_PER_HOUR};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc::Receiver;

    const START: i64 = 1_700_000_000_000;

    fn create_manager() -> (CredentialManager, Arc<ManualClock>, Receiver<GatewayEvent>) {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(StateStore::new("/tmp/unused"));
        let (events, rx) = create_event_channel();
        let policy = CredentialPolicyConfig {
            expiry_warning_millis: hours_to_millis(24),
            sweep_interval: Duration::from_secs(60),
            default_validity_millis: None,
        };
        (CredentialManager::new(policy, store, clock.clone(), events), clock, rx)
    }

    fn config_user(username: &str, password: &str) -> CredentialConfigDto {
        CredentialConfigDto { username: username.to_string(), password: password.to_string(), max_connections: 0, exp_date: None, telegram_id: None }
    }

    #[tokio::test]
    async fn test_issue_and_authenticate() {
        let (manager, _, _rx) = create_manager();
        let (credential, password) = manager.issue("alice", None, &IssueOptions::default()).unwrap();
        assert_eq!(password.len(), 16);
        assert_ne!(credential.password, password);
        assert!(manager.authenticate("alice", &password).await.is_ok());
        assert_eq!(manager.authenticate("alice", "wrong").await, Err(AuthFailure::InvalidPassword));
        assert_eq!(manager.authenticate("nobody", "wrong").await, Err(AuthFailure::UnknownUser));
    }

    #[test]
    fn test_usernames_are_unique() {
        let (manager, _, _rx) = create_manager();
        manager.sync_config_credentials(&[config_user("bob", "secret")]);
        assert!(matches!(manager.issue("bob", Some("pwd"), &IssueOptions::default()), Err(CredentialError::AlreadyExists(_))));
        assert!(manager.issue("carol", Some("pwd"), &IssueOptions::default()).is_ok());
        assert!(matches!(manager.issue("carol", Some("pwd"), &IssueOptions::default()), Err(CredentialError::AlreadyExists(_))));
        assert!(matches!(manager.issue("no spaces", None, &IssueOptions::default()), Err(CredentialError::InvalidUsername(_))));
    }

    #[tokio::test]
    async fn test_sync_config_credentials() {
        let (manager, _, _rx) = create_manager();
        manager.sync_config_credentials(&[config_user("bob", "secret"), config_user("dave", "pwd")]);
        assert!(manager.authenticate("bob", "secret").await.is_ok());
        manager.sync_config_credentials(&[config_user("bob", "changed")]);
        assert_eq!(manager.authenticate("bob", "secret").await, Err(AuthFailure::InvalidPassword));
        assert!(manager.authenticate("bob", "changed").await.is_ok());
        assert_eq!(manager.authenticate("dave", "pwd").await, Err(AuthFailure::UnknownUser));
    }

    #[test]
    fn test_revoke() {
        let (manager, _, _rx) = create_manager();
        manager.sync_config_credentials(&[config_user("bob", "secret")]);
        manager.issue("alice", Some("pwd"), &IssueOptions::default()).unwrap();
        assert!(matches!(manager.revoke("bob"), Err(CredentialError::ConfigManaged(_))));
        assert_eq!(manager.revoke("alice").unwrap().source, CredentialSource::Issued);
        assert!(matches!(manager.revoke("alice"), Err(CredentialError::NotFound(_))));
        assert_eq!(manager.list().len(), 1);
    }

    #[tokio::test]
    async fn test_expiry_sweep_disables_and_notifies_once() {
        let (manager, clock, mut rx) = create_manager();
        let options = IssueOptions { expires_in_millis: Some(hours_to_millis(30)), ..IssueOptions::default() };
        let (_, password) = manager.issue("alice", None, &options).unwrap();

        assert!(manager.sweep_expiry().warned.is_empty());

        clock.advance(hours_to_millis(10));
        let sweep = manager.sweep_expiry();
        assert_eq!(sweep.warned, vec!["alice".to_string()]);
        assert_eq!(rx.try_recv().unwrap(), GatewayEvent::CredentialExpiringSoon { username: "alice".to_string(), hours_left: 20 });

        clock.advance(MILLIS_PER_HOUR);
        assert!(manager.sweep_expiry().warned.is_empty());
        assert!(rx.try_recv().is_err());

        clock.advance(hours_to_millis(20));
        assert_eq!(manager.authenticate("alice", &password).await, Err(AuthFailure::Expired));
        let sweep = manager.sweep_expiry();
        assert_eq!(sweep.disabled, vec!["alice".to_string()]);
        assert_eq!(manager.authenticate("alice", &password).await, Err(AuthFailure::Disabled));
        assert!(manager.sweep_expiry().disabled.is_empty());
    }
}
