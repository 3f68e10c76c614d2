use crate::utils::telegram::{telegram_create_instance, telegram_send_message};
use chrono::Utc;
use log::{debug, error, info, warn};
use reqwest::{header, Method};
use serde_json::json;
use shared::model::{MessagingConfigDto, MsgKind};
use shared::utils::sanitize_sensitive_info;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    QuotaExceeded { username: String },
    PermanentPromotion { username: String },
    CredentialExpiringSoon { username: String, hours_left: u64 },
    Error(String),
}

impl GatewayEvent {
    pub fn kind(&self) -> MsgKind {
        match self {
            GatewayEvent::QuotaExceeded { .. } => MsgKind::QuotaExceeded,
            GatewayEvent::PermanentPromotion { .. } => MsgKind::PermanentPromotion,
            GatewayEvent::CredentialExpiringSoon { .. } => MsgKind::CredentialExpiring,
            GatewayEvent::Error(_) => MsgKind::Error,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            GatewayEvent::QuotaExceeded { username }
            | GatewayEvent::PermanentPromotion { username }
            | GatewayEvent::CredentialExpiringSoon { username, .. } => Some(username),
            GatewayEvent::Error(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            GatewayEvent::QuotaExceeded { username } => format!("User {username} exceeded the playlist quota and is disabled for one window"),
            GatewayEvent::PermanentPromotion { username } => format!("User {username} was promoted to permanent access"),
            GatewayEvent::CredentialExpiringSoon { username, hours_left } => format!("Credential of {username} expires in {hours_left}h"),
            GatewayEvent::Error(msg) => msg.clone(),
        }
    }
}

/// Non blocking handle used by the request path to publish events.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::Sender<GatewayEvent>,
}

impl EventSender {
    pub fn send(&self, event: GatewayEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!("Notification queue is full, dropping {} event", event.kind()),
            Err(TrySendError::Closed(event)) => debug!("Notification queue is closed, dropping {} event", event.kind()),
        }
    }
}

pub fn create_event_channel() -> (EventSender, mpsc::Receiver<GatewayEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (EventSender { tx }, rx)
}

fn is_enabled(kind: MsgKind, cfg: &MessagingConfigDto) -> bool {
    cfg.notify_on.contains(&kind)
}

async fn send_telegram_message(client: &reqwest::Client, event: &GatewayEvent, messaging: &MessagingConfigDto) {
    if let Some(telegram) = &messaging.telegram {
        let msg = event.message();
        for chat_id in &telegram.chat_ids {
            let bot = telegram_create_instance(&telegram.bot_token, chat_id);
            telegram_send_message(client, &bot, &msg).await;
        }
    }
}

async fn send_rest_message(client: &reqwest::Client, event: &GatewayEvent, messaging: &MessagingConfigDto) {
    if let Some(rest) = &messaging.rest {
        let body = json!({
            "kind": event.kind(),
            "username": event.username(),
            "message": event.message(),
            "timestamp": Utc::now().to_rfc3339(),
        }).to_string();
        let method = Method::from_str(&rest.method.to_uppercase()).unwrap_or(Method::POST);

        let mut rb = client.request(method, &rest.url);

        let has_content_type = rest.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            rb = rb.header(header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string());
        }

        for (key, value) in &rest.headers {
            rb = rb.header(key, value);
        }

        match rb.body(body).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!("Message sent successfully to rest api");
                } else {
                    error!("Failed to send message to rest api, status code {}", response.status());
                }
            }
            Err(e) => error!("Message wasn't sent to rest api because of: {}", sanitize_sensitive_info(&e.to_string())),
        }
    }
}

async fn dispatch_event(client: &reqwest::Client, messaging: Option<&MessagingConfigDto>, event: &GatewayEvent) {
    info!("{}", event.message());
    if let Some(messaging) = messaging {
        if is_enabled(event.kind(), messaging) {
            tokio::join!(
                send_telegram_message(client, event, messaging),
                send_rest_message(client, event, messaging),
            );
        }
    }
}

/// Delivers queued events until the channel closes or the token is cancelled.
pub fn exec_messaging(client: reqwest::Client, messaging: Option<MessagingConfigDto>,
                      mut rx: mpsc::Receiver<GatewayEvent>, cancel_token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    dispatch_event(&client, messaging.as_ref(), &event).await;
                }
            }
        }
        debug!("Messaging stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::{create_event_channel, is_enabled, GatewayEvent};
    use shared::model::{MessagingConfigDto, MsgKind};

    #[test]
    fn test_event_kind_and_message() {
        let event = GatewayEvent::CredentialExpiringSoon { username: "alice".to_string(), hours_left: 5 };
        assert_eq!(event.kind(), MsgKind::CredentialExpiring);
        assert_eq!(event.username(), Some("alice"));
        assert_eq!(event.message(), "Credential of alice expires in 5h");
    }

    #[test]
    fn test_is_enabled() {
        let cfg = MessagingConfigDto { notify_on: vec![MsgKind::QuotaExceeded], telegram: None, rest: None };
        assert!(is_enabled(MsgKind::QuotaExceeded, &cfg));
        assert!(!is_enabled(MsgKind::PermanentPromotion, &cfg));
    }

    #[tokio::test]
    async fn test_send_never_blocks() {
        let (sender, mut rx) = create_event_channel();
        for _ in 0..1_000 {
            sender.send(GatewayEvent::QuotaExceeded { username: "alice".to_string() });
        }
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 256);
        drop(rx);
        sender.send(GatewayEvent::Error("closed".to_string()));
    }
}
