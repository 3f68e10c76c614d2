use crate::utils::telegram::{telegram_api_url, telegram_create_instance};
use log::warn;
use serde_json::Value;
use shared::model::GroupCheckConfigDto;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Active,
    Inactive,
    /// The check failed, callers treat the user as still active.
    Unknown,
}

impl MembershipStatus {
    pub fn is_inactive(self) -> bool {
        self == MembershipStatus::Inactive
    }
}

/// Maps a `getChatMember` response to a membership status.
pub fn parse_member_status(response: &Value) -> MembershipStatus {
    if !response.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return MembershipStatus::Unknown;
    }
    let Some(member) = response.get("result") else {
        return MembershipStatus::Unknown;
    };
    match member.get("status").and_then(Value::as_str) {
        Some("creator" | "administrator" | "member") => MembershipStatus::Active,
        Some("restricted") => {
            if member.get("is_member").and_then(Value::as_bool).unwrap_or(false) {
                MembershipStatus::Active
            } else {
                MembershipStatus::Inactive
            }
        }
        Some("left" | "kicked") => MembershipStatus::Inactive,
        _ => MembershipStatus::Unknown,
    }
}

/// Asks the Telegram bot api whether a user still belongs to the configured chat.
pub struct GroupMembershipChecker {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    timeout: Duration,
}

impl GroupMembershipChecker {
    pub fn new(client: reqwest::Client, config: &GroupCheckConfigDto) -> Self {
        let bot = telegram_create_instance(&config.bot_token, &config.chat_id);
        Self {
            client,
            bot_token: bot.bot_token,
            chat_id: bot.chat_id,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    pub async fn is_user_active_in_group(&self, telegram_id: i64) -> MembershipStatus {
        let url = match telegram_api_url(&self.bot_token, "getChatMember") {
            Ok(url) => url,
            Err(err) => {
                warn!("Group membership check failed: {err}");
                return MembershipStatus::Unknown;
            }
        };
        let user_id = telegram_id.to_string();
        let request = self.client.get(url)
            .query(&[("chat_id", self.chat_id.as_str()), ("user_id", user_id.as_str())])
            .timeout(self.timeout);

        match request.send().await {
            Ok(response) => match response.json::<Value>().await {
                Ok(body) => {
                    let status = parse_member_status(&body);
                    if status == MembershipStatus::Unknown {
                        warn!("Unexpected group membership response for telegram user {telegram_id}");
                    }
                    status
                }
                Err(err) => {
                    warn!("Group membership response for telegram user {telegram_id} could not be parsed: {}", err.without_url());
                    MembershipStatus::Unknown
                }
            },
            // reqwest errors carry the url, which contains the bot token
            Err(err) => {
                warn!("Group membership check for telegram user {telegram_id} failed: {}", err.without_url());
                MembershipStatus::Unknown
            }
        }
    }
}
