use crate::access::{GatewayRejection, QuotaDenialReason};
use crate::auth::{CredentialError, TokenErrorKind};
use crate::model::Config;
use crate::BUILD_TIMESTAMP;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use log::error;
use shared::model::ErrorResponseDto;

#[macro_export]
macro_rules! try_unwrap_body {
    ($body:expr) => {
        $body.map_or_else(
            |_| axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            |resp| resp.into_response(),
        )
    };
}

pub use try_unwrap_body;

pub fn get_server_time() -> String {
    chrono::offset::Local::now()
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

pub fn get_build_time() -> Option<String> {
    BUILD_TIMESTAMP
        .and_then(|ts| ts.parse::<DateTime<Utc>>().ok())
        .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S %Z").to_string())
}

pub fn redirect(url: &str) -> impl IntoResponse {
    try_unwrap_body!(axum::response::Response::builder()
        .status(StatusCode::FOUND)
        .header(axum::http::header::LOCATION, url)
        .body(axum::body::Body::empty()))
}

pub fn json_error(status: StatusCode, error: &ErrorResponseDto) -> axum::response::Response {
    let mut response = (status, axum::Json(error)).into_response();
    if let Some(secs) = error.retry_after_secs.filter(|secs| *secs > 0) {
        if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
        }
    }
    response
}

pub fn rejection_status(rejection: &GatewayRejection) -> StatusCode {
    match rejection {
        GatewayRejection::Auth(_) => StatusCode::UNAUTHORIZED,
        GatewayRejection::Quota(denied) => match denied.reason {
            QuotaDenialReason::LimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            QuotaDenialReason::TooManyActivePlaylists => StatusCode::CONFLICT,
            QuotaDenialReason::AccountDisabled | QuotaDenialReason::UserNotInGroup => StatusCode::FORBIDDEN,
        },
        GatewayRejection::Token(kind) => match kind {
            TokenErrorKind::Malformed => StatusCode::BAD_REQUEST,
            TokenErrorKind::Expired => StatusCode::GONE,
            TokenErrorKind::UsageLimit => StatusCode::TOO_MANY_REQUESTS,
            TokenErrorKind::UserMismatch | TokenErrorKind::IpMismatch => StatusCode::FORBIDDEN,
        },
        GatewayRejection::Concurrency(_) => StatusCode::TOO_MANY_REQUESTS,
        GatewayRejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn rejection_to_dto(rejection: &GatewayRejection) -> ErrorResponseDto {
    let mut dto = ErrorResponseDto::new(rejection.code(), rejection.to_string());
    match rejection {
        GatewayRejection::Quota(denied) => {
            dto.retry_after_secs = denied.retry_after_secs();
            if denied.max_simultaneous_playlists > 0 {
                dto.current = Some(denied.active_playlists);
                dto.max = Some(denied.max_simultaneous_playlists);
            }
        }
        GatewayRejection::Concurrency(denied) => {
            dto.current = Some(denied.current_devices);
            dto.max = Some(denied.max_devices);
        }
        GatewayRejection::Auth(_) | GatewayRejection::Token(_) | GatewayRejection::Internal(_) => {}
    }
    dto
}

/// Maps a rejection to its json response. Internal faults are logged, policy
/// rejections are expected traffic.
pub fn error_response(rejection: &GatewayRejection) -> axum::response::Response {
    if let GatewayRejection::Internal(msg) = rejection {
        error!("{msg}");
    }
    json_error(rejection_status(rejection), &rejection_to_dto(rejection))
}

pub fn credential_error_response(err: &CredentialError) -> axum::response::Response {
    let (status, code) = match err {
        CredentialError::InvalidUsername(_) => (StatusCode::BAD_REQUEST, "INVALID_USERNAME"),
        CredentialError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
        CredentialError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CredentialError::ConfigManaged(_) => (StatusCode::CONFLICT, "CONFIG_MANAGED"),
        CredentialError::Internal(inner) => {
            error!("{inner}");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };
    json_error(status, &ErrorResponseDto::new(code, err.to_string()))
}

/// Base url for links written into playlists.
pub fn get_base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = config.api.public_url.as_deref() {
        return url.to_string();
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty());
    let forwarded = |name: &str| if config.api.trust_forwarded_headers { header(name) } else { None };
    let scheme = forwarded("x-forwarded-proto").unwrap_or("http");
    let host = forwarded("x-forwarded-host")
        .or_else(|| header(axum::http::header::HOST.as_str()))
        .map_or_else(|| format!("{}:{}", config.api.host, config.api.port), ToString::to_string);
    format!("{scheme}://{host}")
}
