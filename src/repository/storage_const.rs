pub(in crate::repository) const FILE_CREDENTIALS: &str = "credentials.json";
pub(in crate::repository) const FILE_QUOTAS: &str = "quotas.json";
pub(in crate::repository) const FILE_PLAYLIST_HISTORY: &str = "playlist_history.json";
pub(in crate::repository) const FILE_TOKEN_USAGE: &str = "token_usage.json";
pub(in crate::repository) const FILE_STREAMS: &str = "streams.json";
pub(in crate::repository) const SNAPSHOT_VERSION: u32 = 1;
