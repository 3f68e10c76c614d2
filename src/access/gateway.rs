use crate::access::{ConcurrencyDenied, ConcurrencyLimiter, GroupMembershipChecker, PlaylistGrant, QuotaDenied, QuotaEngine};
use crate::auth::{AuthFailure, CredentialError, CredentialManager, IssueOptions, TokenCodec, TokenErrorKind};
use crate::catalog::{render_playlist, ChannelCatalog};
use crate::messaging::EventSender;
use crate::model::{Config, Credential};
use crate::repository::StateStore;
use crate::utils::{debug_if_enabled, Clock};
use log::{info, warn};
use shared::error::GatewayError;
use shared::model::QuotaStatusDto;
use shared::utils::MILLIS_PER_SECOND;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Every way a gateway request can be turned down.
#[derive(Debug)]
pub enum GatewayRejection {
    Auth(AuthFailure),
    Quota(QuotaDenied),
    Token(TokenErrorKind),
    Concurrency(ConcurrencyDenied),
    Internal(String),
}

impl GatewayRejection {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayRejection::Auth(failure) => failure.code(),
            GatewayRejection::Quota(denied) => denied.reason.code(),
            GatewayRejection::Token(kind) => kind.code(),
            GatewayRejection::Concurrency(denied) => denied.code(),
            GatewayRejection::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl Display for GatewayRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayRejection::Auth(failure) => write!(f, "{failure}"),
            GatewayRejection::Quota(denied) => write!(f, "{denied}"),
            GatewayRejection::Token(kind) => write!(f, "{}", kind.message()),
            GatewayRejection::Concurrency(denied) => write!(f, "{denied}"),
            GatewayRejection::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GatewayRejection {}

impl From<AuthFailure> for GatewayRejection {
    fn from(value: AuthFailure) -> Self {
        GatewayRejection::Auth(value)
    }
}

impl From<QuotaDenied> for GatewayRejection {
    fn from(value: QuotaDenied) -> Self {
        GatewayRejection::Quota(value)
    }
}

impl From<TokenErrorKind> for GatewayRejection {
    fn from(value: TokenErrorKind) -> Self {
        GatewayRejection::Token(value)
    }
}

impl From<ConcurrencyDenied> for GatewayRejection {
    fn from(value: ConcurrencyDenied) -> Self {
        GatewayRejection::Concurrency(value)
    }
}

#[derive(Debug)]
pub struct PlaylistResponse {
    pub body: String,
    pub grant: PlaylistGrant,
    pub channels: usize,
}

/// Ties authentication, quota, tokens and stream admission together.
pub struct AccessGateway {
    credentials: CredentialManager,
    codec: TokenCodec,
    quota: QuotaEngine,
    limiter: ConcurrencyLimiter,
    catalog: ChannelCatalog,
    membership: Option<GroupMembershipChecker>,
}

impl AccessGateway {
    pub fn new(config: &Config, store: &Arc<StateStore>, clock: &Arc<dyn Clock>,
               events: &EventSender, client: &reqwest::Client) -> Result<Self, GatewayError> {
        let codec = TokenCodec::new(&config.secret, config.token.clone(), Arc::clone(store), Arc::clone(clock))?;
        let credentials = CredentialManager::new(config.credential_policy.clone(), Arc::clone(store), Arc::clone(clock), events.clone());
        let quota = QuotaEngine::new(config.quota.clone(), config.token.link_expiry_millis, Arc::clone(store), Arc::clone(clock), events.clone());
        let limiter = ConcurrencyLimiter::new(config.concurrency.clone(), Arc::clone(store), Arc::clone(clock));
        let catalog = ChannelCatalog::new(config.catalog.clone(), client.clone());
        let membership = config.group_check.as_ref().map(|cfg| GroupMembershipChecker::new(client.clone(), cfg));
        let synced = credentials.sync_config_credentials(&config.credentials);
        debug_if_enabled!("Synced {} config credentials", synced);
        Ok(Self { credentials, codec, quota, limiter, catalog, membership })
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn quota(&self) -> &QuotaEngine {
        &self.quota
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn catalog(&self) -> &ChannelCatalog {
        &self.catalog
    }

    /// Builds a playlist whose entries point to `{base_url}/redirect/...`.
    pub async fn playlist(&self, username: &str, password: &str, client_ip: &str, base_url: &str) -> Result<PlaylistResponse, GatewayRejection> {
        let credential = self.credentials.authenticate(username, password).await.inspect_err(|failure| {
            debug_if_enabled!("Playlist login of {} failed: {:?}", username, failure);
        })?;

        if let (Some(checker), Some(telegram_id)) = (self.membership.as_ref(), credential.source_telegram_id) {
            if checker.is_user_active_in_group(telegram_id).await.is_inactive() {
                info!("User {username} left the group");
                self.remove_user_state(&credential);
                return Err(QuotaDenied::not_in_group().into());
            }
        }

        let channels = self.catalog.get_channels();
        if channels.is_empty() {
            return Err(GatewayRejection::Internal("No channels available".to_string()));
        }

        let grant = self.quota.request_playlist(username, client_ip)?;
        let mut entries = Vec::with_capacity(channels.len());
        for channel in channels.iter() {
            let payload = self.codec.new_payload(username, &channel.id, &channel.url, &grant.playlist_id, grant.is_permanent, client_ip);
            let token = self.codec.issue(&payload).map_err(|err| GatewayRejection::Internal(err.to_string()))?;
            entries.push((channel, token));
        }
        Ok(PlaylistResponse {
            body: render_playlist(base_url, username, &entries),
            channels: entries.len(),
            grant,
        })
    }

    /// Validates a redirect and admits the stream. Returns the origin url.
    /// A token use is only counted once the stream is admitted.
    pub fn redirect(&self, username: &str, token: &str, client_ip: &str) -> Result<String, GatewayRejection> {
        let credential = self.credentials.active_credential(username)?;
        let payload = self.codec.inspect(token, username, client_ip)?;
        if payload.policy.is_permanent() && !self.quota.is_playlist_active(username, &payload.playlist_id) {
            debug_if_enabled!("Permanent token of {} belongs to a replaced playlist", username);
            return Err(TokenErrorKind::Expired.into());
        }
        self.codec.check_usage(token, &payload)?;
        let device_cap = credential.device_cap(self.limiter.default_device_cap());
        self.limiter.admit(username, &payload.channel_id, client_ip, device_cap)?;
        self.codec.record_use(token, &payload)?;
        Ok(payload.target_url)
    }

    /// Keeps a stream alive. Returns false if the stream is not admitted.
    pub fn heartbeat(&self, username: &str, token: &str, client_ip: &str) -> Result<bool, GatewayRejection> {
        self.credentials.active_credential(username)?;
        let payload = self.codec.inspect(token, username, client_ip)?;
        Ok(self.limiter.heartbeat(username, &payload.channel_id, client_ip))
    }

    /// Frees the device slot of a stream. Expired tokens may still release.
    pub fn release(&self, username: &str, token: &str, client_ip: &str) -> Result<bool, GatewayRejection> {
        let payload = match self.codec.inspect(token, username, client_ip) {
            Ok(payload) => payload,
            Err(TokenErrorKind::Expired) => return Ok(false),
            Err(kind) => return Err(kind.into()),
        };
        Ok(self.limiter.release(username, &payload.channel_id, client_ip))
    }

    pub async fn status(&self, username: &str, password: &str) -> Result<QuotaStatusDto, GatewayRejection> {
        let credential = self.credentials.authenticate(username, password).await?;
        let quota = self.quota.status(username);
        let config = self.quota.config();
        let requests_remaining = (!quota.permanent)
            .then(|| config.max_requests_in_window.saturating_sub(quota.requests_in_window));
        Ok(QuotaStatusDto {
            username: credential.username.clone(),
            permanent: quota.permanent,
            disabled: quota.disabled,
            cooldown_remaining_secs: quota.disabled
                .then(|| (quota.cooldown_remaining_millis + MILLIS_PER_SECOND - 1) / MILLIS_PER_SECOND),
            requests_in_window: quota.requests_in_window,
            max_requests_in_window: config.max_requests_in_window,
            requests_remaining,
            active_playlists: quota.active_playlists,
            max_simultaneous_playlists: config.max_simultaneous_playlists,
            active_devices: self.limiter.active_devices(username),
            max_devices: credential.device_cap(self.limiter.default_device_cap()),
        })
    }

    pub fn issue_credential(&self, username: &str, password: Option<&str>, options: &IssueOptions) -> Result<(Credential, String), CredentialError> {
        self.credentials.issue(username, password, options)
    }

    /// Deletes an issued credential with its quota, history and streams.
    pub fn revoke_credential(&self, username: &str) -> Result<Credential, CredentialError> {
        let credential = self.credentials.revoke(username)?;
        self.quota.reset(username);
        self.limiter.release_user(username);
        Ok(credential)
    }

    fn remove_user_state(&self, credential: &Credential) {
        match self.revoke_credential(&credential.username) {
            Ok(_) => {}
            Err(CredentialError::ConfigManaged(username)) => {
                warn!("Config user {username} is not in the group anymore, remove it from the config file");
                self.limiter.release_user(&username);
            }
            Err(err) => warn!("Failed to remove user state: {err}"),
        }
    }
}
