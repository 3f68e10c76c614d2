use crate::access::AccessGateway;
use crate::auth::ClientIpSource;
use crate::messaging::EventSender;
use crate::model::Config;
use crate::repository::StateStore;
use crate::utils::Clock;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<AccessGateway>,
    pub store: Arc<StateStore>,
    pub clock: Arc<dyn Clock>,
    pub events: EventSender,
}

impl FromRef<Arc<AppState>> for ClientIpSource {
    fn from_ref(state: &Arc<AppState>) -> Self {
        ClientIpSource { trust_forwarded_headers: state.config.api.trust_forwarded_headers }
    }
}
