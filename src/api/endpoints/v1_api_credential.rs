use crate::api::api_utils::{credential_error_response, json_error};
use crate::api::model::AppState;
use crate::auth::IssueOptions;
use axum::response::IntoResponse;
use log::error;
use shared::model::{ErrorResponseDto, IssueCredentialRequestDto, IssueCredentialResponseDto};
use shared::utils::hours_to_millis;
use std::sync::Arc;

fn is_valid_admin_token(expected: &str, authorization: Option<&str>) -> bool {
    let Some(token) = authorization.and_then(|value| value.strip_prefix("Bearer ")).map(str::trim) else {
        return false;
    };
    // compare in constant time
    token.len() == expected.len()
        && token.bytes().zip(expected.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

async fn validator_admin(
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let authorization = request.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let authorized = app_state.config.admin.as_ref()
        .is_some_and(|admin| is_valid_admin_token(&admin.token, authorization));
    if authorized {
        next.run(request).await
    } else {
        json_error(axum::http::StatusCode::UNAUTHORIZED,
                   &ErrorResponseDto::new("AUTH_FAILED", "Invalid admin token".to_string()))
    }
}

async fn issue_credential(
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
    axum::Json(req): axum::Json<IssueCredentialRequestDto>,
) -> impl IntoResponse + Send {
    let options = IssueOptions {
        expires_in_millis: req.expires_in_hours.map(hours_to_millis),
        telegram_id: req.telegram_id,
        max_connections: req.max_connections.unwrap_or(0),
    };
    let gateway = Arc::clone(&app_state.gateway);
    // password hashing is cpu bound
    let result = tokio::task::spawn_blocking(move || {
        gateway.issue_credential(&req.username, req.password.as_deref(), &options)
    }).await;
    match result {
        Ok(Ok((credential, password))) => (
            axum::http::StatusCode::CREATED,
            axum::Json(IssueCredentialResponseDto { credential: credential.to_dto(), password }),
        ).into_response(),
        Ok(Err(err)) => credential_error_response(&err),
        Err(err) => {
            error!("Credential issuance failed: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_credentials(
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    axum::Json(app_state.gateway.credentials().list())
}

async fn revoke_credential(
    axum::extract::Path(username): axum::extract::Path<String>,
    axum::extract::State(app_state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    match app_state.gateway.revoke_credential(&username) {
        Ok(credential) => axum::Json(credential.to_dto()).into_response(),
        Err(err) => credential_error_response(&err),
    }
}

/// Credential api, only registered when an admin token is configured.
pub fn v1_api_credential_register(app_state: &Arc<AppState>) -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/api/v1/credentials", axum::routing::get(list_credentials).post(issue_credential))
        .route("/api/v1/credentials/{username}", axum::routing::delete(revoke_credential))
        .route_layer(axum::middleware::from_fn_with_state(Arc::clone(app_state), validator_admin))
}
