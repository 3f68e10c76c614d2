use crate::api::api_utils::{error_response, get_base_url, try_unwrap_body};
use crate::api::model::AppState;
use crate::auth::Fingerprint;
use crate::utils::debug_if_enabled;
use axum::response::IntoResponse;
use serde::Deserialize;
use shared::utils::{HEADER_ACTIVE_PLAYLISTS, HEADER_MAX_SIMULTANEOUS_PLAYLISTS, HEADER_REQUESTS_REMAINING};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UserCredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn playlist_api(
    fingerprint: Fingerprint,
    axum::extract::Query(req): axum::extract::Query<UserCredentialsRequest>,
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse + Send {
    let base_url = get_base_url(&app_state.config, &headers);
    match app_state.gateway.playlist(req.username.trim(), &req.password, &fingerprint.client_ip, &base_url).await {
        Ok(playlist) => {
            debug_if_enabled!("Playlist with {} channels for {} ({})", playlist.channels, req.username, fingerprint.client_ip);
            let grant = &playlist.grant;
            let mut builder = axum::response::Response::builder()
                .status(axum::http::StatusCode::OK)
                .header(axum::http::header::CONTENT_TYPE, "audio/x-mpegurl; charset=utf-8")
                .header("Content-Disposition", "attachment; filename=\"playlist.m3u\"")
                .header(HEADER_ACTIVE_PLAYLISTS, grant.active_playlists.to_string())
                .header(HEADER_MAX_SIMULTANEOUS_PLAYLISTS, grant.max_simultaneous_playlists.to_string());
            if let Some(remaining) = grant.requests_remaining {
                builder = builder.header(HEADER_REQUESTS_REMAINING, remaining.to_string());
            }
            try_unwrap_body!(builder.body(axum::body::Body::from(playlist.body)))
        }
        Err(rejection) => {
            debug_if_enabled!("Playlist for {} rejected: {}", req.username, rejection.code());
            error_response(&rejection)
        }
    }
}

async fn status_api(
    axum::extract::Query(req): axum::extract::Query<UserCredentialsRequest>,
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    match app_state.gateway.status(req.username.trim(), &req.password).await {
        Ok(status) => axum::Json(status).into_response(),
        Err(rejection) => error_response(&rejection),
    }
}

pub fn playlist_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/playlist", axum::routing::get(playlist_api))
        .route("/status", axum::routing::get(status_api))
}
