use crate::model::{Credential, QuotaRecord, TokenUsageRecord, UserPlaylistHistory, UserStreams};
use crate::repository::storage_const;
use crate::repository::{SweepAction, TrackedMap};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::error::{handle_gateway_error_result_list, notify_err, GatewayError, GatewayErrorKind};
use shared::model::CredentialSource;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::task;

/// Expiry settings used to drop stale entries while loading.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub window_millis: i64,
    pub link_expiry_millis: i64,
    pub token_usage_retention_millis: i64,
    pub inactivity_timeout_millis: i64,
}

/// A record that lives in one of the persisted maps.
pub trait StoredEntry: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn key(&self) -> String;

    /// Called for every loaded entry, may prune it. Returns false to drop it.
    fn retain_on_load(&mut self, _now: i64, _retention: &RetentionPolicy) -> bool {
        true
    }

    /// Entries returning false are never written to disk.
    fn is_persistent(&self) -> bool {
        true
    }
}

impl StoredEntry for Credential {
    fn key(&self) -> String {
        self.username.clone()
    }

    fn retain_on_load(&mut self, now: i64, _retention: &RetentionPolicy) -> bool {
        // config users are synced from the config file after load
        self.is_persistent() && !self.is_expired(now)
    }

    fn is_persistent(&self) -> bool {
        self.source == CredentialSource::Issued
    }
}

impl StoredEntry for QuotaRecord {
    fn key(&self) -> String {
        self.username.clone()
    }

    fn retain_on_load(&mut self, now: i64, retention: &RetentionPolicy) -> bool {
        self.refresh(now, retention.window_millis, retention.link_expiry_millis) != SweepAction::Remove
    }
}

impl StoredEntry for UserPlaylistHistory {
    fn key(&self) -> String {
        self.username.clone()
    }
}

impl StoredEntry for TokenUsageRecord {
    fn key(&self) -> String {
        self.token_key.clone()
    }

    fn retain_on_load(&mut self, now: i64, retention: &RetentionPolicy) -> bool {
        !self.is_stale(now, retention.token_usage_retention_millis)
    }
}

impl StoredEntry for UserStreams {
    fn key(&self) -> String {
        self.username.clone()
    }

    fn retain_on_load(&mut self, now: i64, retention: &RetentionPolicy) -> bool {
        self.purge_idle(now, retention.inactivity_timeout_millis);
        !self.records.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile<V> {
    version: u32,
    saved_at: i64,
    entries: Vec<V>,
}

/// Owner of all mutable gateway state. Engines only reach the maps through
/// the accessors below.
pub struct StateStore {
    storage_dir: PathBuf,
    credentials: TrackedMap<Credential>,
    quotas: TrackedMap<QuotaRecord>,
    history: TrackedMap<UserPlaylistHistory>,
    token_usage: TrackedMap<TokenUsageRecord>,
    streams: TrackedMap<UserStreams>,
}

impl StateStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            credentials: TrackedMap::default(),
            quotas: TrackedMap::default(),
            history: TrackedMap::default(),
            token_usage: TrackedMap::default(),
            streams: TrackedMap::default(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn credentials(&self) -> &TrackedMap<Credential> {
        &self.credentials
    }

    pub fn quotas(&self) -> &TrackedMap<QuotaRecord> {
        &self.quotas
    }

    pub fn history(&self) -> &TrackedMap<UserPlaylistHistory> {
        &self.history
    }

    pub fn token_usage(&self) -> &TrackedMap<TokenUsageRecord> {
        &self.token_usage
    }

    pub fn streams(&self) -> &TrackedMap<UserStreams> {
        &self.streams
    }

    pub fn is_dirty(&self) -> bool {
        self.credentials.is_dirty()
            || self.quotas.is_dirty()
            || self.history.is_dirty()
            || self.token_usage.is_dirty()
            || self.streams.is_dirty()
    }

    /// Reads every snapshot file. Missing or unreadable files leave the map empty.
    pub fn load(&self, now: i64, retention: &RetentionPolicy) {
        load_map(&self.storage_dir, storage_const::FILE_CREDENTIALS, &self.credentials, now, retention);
        load_map(&self.storage_dir, storage_const::FILE_QUOTAS, &self.quotas, now, retention);
        load_map(&self.storage_dir, storage_const::FILE_PLAYLIST_HISTORY, &self.history, now, retention);
        load_map(&self.storage_dir, storage_const::FILE_TOKEN_USAGE, &self.token_usage, now, retention);
        load_map(&self.storage_dir, storage_const::FILE_STREAMS, &self.streams, now, retention);
    }

    /// Writes all modified maps. Returns the number of files written.
    pub async fn snapshot(&self, now: i64) -> Result<usize, GatewayError> {
        if let Err(err) = tokio::fs::create_dir_all(&self.storage_dir).await {
            return Err(notify_err!("Failed to create storage dir {}: {err}", self.storage_dir.display()));
        }
        let results = [
            snapshot_map(&self.storage_dir, storage_const::FILE_CREDENTIALS, &self.credentials, now).await,
            snapshot_map(&self.storage_dir, storage_const::FILE_QUOTAS, &self.quotas, now).await,
            snapshot_map(&self.storage_dir, storage_const::FILE_PLAYLIST_HISTORY, &self.history, now).await,
            snapshot_map(&self.storage_dir, storage_const::FILE_TOKEN_USAGE, &self.token_usage, now).await,
            snapshot_map(&self.storage_dir, storage_const::FILE_STREAMS, &self.streams, now).await,
        ];
        let written = results.iter().filter(|r| matches!(r, Ok(true))).count();
        handle_gateway_error_result_list!(GatewayErrorKind::Notify, results.iter());
        Ok(written)
    }
}

fn load_map<V: StoredEntry>(storage_dir: &Path, file_name: &str, map: &TrackedMap<V>, now: i64, retention: &RetentionPolicy) {
    let path = storage_dir.join(file_name);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("No snapshot {}, starting empty", path.display());
            return;
        }
        Err(err) => {
            error!("Failed to read snapshot {}: {err}", path.display());
            return;
        }
    };
    match serde_json::from_str::<SnapshotFile<V>>(&content) {
        Ok(snapshot) => {
            let total = snapshot.entries.len();
            let entries: Vec<(String, V)> = snapshot.entries.into_iter()
                .filter_map(|mut entry| entry.retain_on_load(now, retention).then(|| (entry.key(), entry)))
                .collect();
            info!("Loaded {} of {total} entries from {}", entries.len(), path.display());
            map.load(entries);
        }
        Err(err) => {
            warn!("Snapshot {} is corrupt, starting empty: {err}", path.display());
        }
    }
}

async fn snapshot_map<V: StoredEntry>(storage_dir: &Path, file_name: &str, map: &TrackedMap<V>, now: i64) -> Result<bool, GatewayError> {
    let Some(mut entries) = map.take_snapshot() else {
        return Ok(false);
    };
    entries.retain(V::is_persistent);
    let dir = storage_dir.to_path_buf();
    let path = storage_dir.join(file_name);
    let snapshot = SnapshotFile { version: storage_const::SNAPSHOT_VERSION, saved_at: now, entries };
    let result = task::spawn_blocking(move || write_snapshot_file(&dir, &path, &snapshot))
        .await
        .map_err(|err| notify_err!("Snapshot task for {file_name} failed: {err}"))
        .and_then(|r| r);
    if result.is_err() {
        map.restore_dirty();
    }
    result.map(|()| true)
}

fn write_snapshot_file<V: Serialize>(dir: &Path, path: &Path, snapshot: &SnapshotFile<V>) -> Result<(), GatewayError> {
    let to_err = |err: &dyn std::fmt::Display| notify_err!("Failed to write snapshot {}: {err}", path.display());
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| to_err(&e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, snapshot).map_err(|e| to_err(&e))?;
        writer.flush().map_err(|e| to_err(&e))?;
    }
    tmp.as_file().sync_all().map_err(|e| to_err(&e))?;
    tmp.persist(path).map_err(|e| to_err(&e.error))?;
    Ok(())
}
