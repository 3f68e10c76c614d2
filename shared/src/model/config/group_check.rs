use crate::utils::default_group_check_timeout_secs;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupCheckConfigDto {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_group_check_timeout_secs")]
    pub timeout_secs: u64,
}
