use log::{debug, error};
use url::Url;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Requests will be sent according to bot instance.
#[derive(Clone)]
pub struct BotInstance {
    pub bot_token: String,
    pub chat_id: String,
    pub message_thread_id: Option<String>,
}

/// Telegram's error result.
#[derive(Debug, serde::Deserialize)]
struct TelegramErrorResult {
    #[allow(unused)]
    pub ok: bool,
    #[allow(unused)]
    pub error_code: i32,
    pub description: String,
}

#[derive(Debug, serde::Serialize)]
struct RequestObj {
    pub chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<String>,
    pub text: String,
}

/// Create an instance to interact with APIs.
pub fn telegram_create_instance(bot_token: &str, chat_id: &str) -> BotInstance {
    // chat-id:thread-id
    let mut parts = chat_id.splitn(2, ':');
    let chat_id_part = parts.next().unwrap_or_default();
    let thread_id_part = parts.next().map(ToString::to_string);

    BotInstance {
        bot_token: bot_token.to_string(),
        chat_id: chat_id_part.to_string(),
        message_thread_id: thread_id_part,
    }
}

pub fn telegram_api_url(bot_token: &str, method: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{TELEGRAM_API}/bot{bot_token}/{method}"))
}

pub async fn telegram_send_message(client: &reqwest::Client, instance: &BotInstance, msg: &str) {
    let chat_id = instance.chat_id.as_str();
    let url = match telegram_api_url(&instance.bot_token, "sendMessage") {
        Ok(url) => url,
        Err(e) => {
            error!("Message wasn't sent to {chat_id} telegram api because of: {e}");
            return;
        }
    };

    let request_json_obj = RequestObj {
        chat_id: instance.chat_id.clone(),
        message_thread_id: instance.message_thread_id.clone(),
        text: msg.to_string(),
    };

    match client.post(url).json(&request_json_obj).send().await {
        Ok(response) => {
            if response.status().is_success() {
                debug!("Message sent successfully to {chat_id} telegram api");
            } else {
                match response.json::<TelegramErrorResult>().await {
                    Ok(json) => error!("Message wasn't sent to {chat_id} telegram api because of: {}", json.description),
                    Err(_) => error!("Message wasn't sent to {chat_id} telegram api. Telegram response could not be parsed!"),
                }
            }
        }
        // reqwest errors carry the url, which contains the bot token
        Err(e) => error!("Message wasn't sent to {chat_id} telegram api because of: {}", e.without_url()),
    }
}
