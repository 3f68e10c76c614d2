use crate::api::api_utils::{error_response, json_error, redirect};
use crate::api::model::AppState;
use crate::auth::Fingerprint;
use crate::utils::debug_if_enabled;
use axum::response::IntoResponse;
use shared::model::ErrorResponseDto;
use shared::utils::sanitize_sensitive_info;
use std::sync::Arc;

fn stream_not_found() -> axum::response::Response {
    json_error(axum::http::StatusCode::NOT_FOUND,
               &ErrorResponseDto::new("STREAM_NOT_FOUND", "No active stream for this token".to_string()))
}

async fn redirect_api(
    fingerprint: Fingerprint,
    axum::extract::Path((username, token)): axum::extract::Path<(String, String)>,
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    match app_state.gateway.redirect(&username, &token, &fingerprint.client_ip) {
        Ok(target_url) => {
            debug_if_enabled!("Redirect {} ({}) to {}", username, fingerprint.client_ip, sanitize_sensitive_info(&target_url));
            redirect(&target_url).into_response()
        }
        Err(rejection) => {
            debug_if_enabled!("Redirect for {} rejected: {}", username, rejection.code());
            error_response(&rejection)
        }
    }
}

async fn heartbeat_api(
    fingerprint: Fingerprint,
    axum::extract::Path((username, token)): axum::extract::Path<(String, String)>,
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    match app_state.gateway.heartbeat(&username, &token, &fingerprint.client_ip) {
        Ok(true) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Ok(false) => stream_not_found(),
        Err(rejection) => error_response(&rejection),
    }
}

async fn release_api(
    fingerprint: Fingerprint,
    axum::extract::Path((username, token)): axum::extract::Path<(String, String)>,
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    match app_state.gateway.release(&username, &token, &fingerprint.client_ip) {
        Ok(true) => axum::http::StatusCode::NO_CONTENT.into_response(),
        Ok(false) => stream_not_found(),
        Err(rejection) => error_response(&rejection),
    }
}

pub fn stream_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/redirect/{username}/{token}", axum::routing::get(redirect_api))
        .route("/stream/{username}/{token}/heartbeat", axum::routing::post(heartbeat_api))
        .route("/stream/{username}/{token}/release", axum::routing::post(release_api))
}
