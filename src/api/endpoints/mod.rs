pub mod playlist_api;
pub mod stream_api;
pub mod v1_api_credential;
