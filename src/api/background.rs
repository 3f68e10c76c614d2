use crate::api::model::AppState;
use crate::messaging::GatewayEvent;
use log::{debug, error, info, warn};
use shared::error::GatewayErrorKind;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Runs `task` every `period` until the token is cancelled. The first run
/// happens one period after start.
fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, cancel_token: &CancellationToken, task: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output=()> + Send + 'static,
{
    let cancel_token = cancel_token.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                _ = interval.tick() => task().await,
            }
        }
        debug!("Background task {name} stopped");
    })
}

fn exec_quota_sweep(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> JoinHandle<()> {
    let state = Arc::clone(app_state);
    let period = app_state.config.quota.sweep_interval;
    spawn_periodic("quota sweep", period, cancel_token, move || {
        let removed = state.gateway.quota().sweep();
        if removed > 0 {
            debug!("Quota sweep removed {removed} records");
        }
        std::future::ready(())
    })
}

fn exec_token_usage_sweep(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> JoinHandle<()> {
    let state = Arc::clone(app_state);
    let period = app_state.config.token.sweep_interval;
    spawn_periodic("token usage sweep", period, cancel_token, move || {
        let removed = state.gateway.codec().sweep_usage();
        if removed > 0 {
            debug!("Token usage sweep removed {removed} counters");
        }
        std::future::ready(())
    })
}

fn exec_concurrency_sweep(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> JoinHandle<()> {
    let state = Arc::clone(app_state);
    let period = app_state.config.concurrency.sweep_interval;
    spawn_periodic("concurrency sweep", period, cancel_token, move || {
        let removed = state.gateway.limiter().sweep();
        if removed > 0 {
            debug!("Concurrency sweep removed {removed} idle streams");
        }
        std::future::ready(())
    })
}

fn exec_credential_expiry(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> JoinHandle<()> {
    let state = Arc::clone(app_state);
    let period = app_state.config.credential_policy.sweep_interval;
    spawn_periodic("credential expiry", period, cancel_token, move || {
        let sweep = state.gateway.credentials().sweep_expiry();
        for username in &sweep.disabled {
            state.gateway.limiter().release_user(username);
        }
        if !sweep.warned.is_empty() {
            debug!("Expiry warning sent for {} credentials", sweep.warned.len());
        }
        std::future::ready(())
    })
}

/// Writes the state store to disk, called periodically and on shutdown.
pub async fn flush_state(app_state: &AppState) {
    match app_state.store.snapshot(app_state.clock.now_millis()).await {
        Ok(0) => {}
        Ok(count) => debug!("State snapshot written, {count} files"),
        Err(err) => {
            error!("{err}");
            if err.kind == GatewayErrorKind::Notify {
                app_state.events.send(GatewayEvent::Error(err.message));
            }
        }
    }
}

fn exec_snapshot(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> JoinHandle<()> {
    let state = Arc::clone(app_state);
    let period = app_state.config.persistence.snapshot_interval;
    spawn_periodic("snapshot", period, cancel_token, move || {
        let state = Arc::clone(&state);
        async move { flush_state(&state).await }
    })
}

fn exec_catalog_refresh(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> JoinHandle<()> {
    let state = Arc::clone(app_state);
    let period = app_state.config.catalog.refresh_interval;
    spawn_periodic("catalog refresh", period, cancel_token, move || {
        let state = Arc::clone(&state);
        async move {
            if let Err(err) = state.gateway.catalog().refresh().await {
                warn!("{err}");
            }
        }
    })
}

/// Starts the independent maintenance tasks. Each task has its own interval,
/// a slow one never delays the others.
pub fn exec_background_tasks(app_state: &Arc<AppState>, cancel_token: &CancellationToken) -> Vec<JoinHandle<()>> {
    let tasks = vec![
        exec_quota_sweep(app_state, cancel_token),
        exec_token_usage_sweep(app_state, cancel_token),
        exec_concurrency_sweep(app_state, cancel_token),
        exec_credential_expiry(app_state, cancel_token),
        exec_snapshot(app_state, cancel_token),
        exec_catalog_refresh(app_state, cancel_token),
    ];
    info!("Started {} background tasks", tasks.len());
    tasks
}
