use regex::Regex;
use std::sync::atomic::AtomicBool;
use std::sync::LazyLock;

pub const CONFIG_PATH: &str = "config";
pub const CONFIG_FILE: &str = "config.yml";

pub const HEADER_ACTIVE_PLAYLISTS: &str = "X-Active-Playlists";
pub const HEADER_MAX_SIMULTANEOUS_PLAYLISTS: &str = "X-Max-Simultaneous-Playlists";
pub const HEADER_REQUESTS_REMAINING: &str = "X-Requests-Remaining";

pub struct Constants {
    pub re_credentials: Regex,
    pub re_redirect_token: Regex,
    pub re_ipv4: Regex,
    pub re_url: Regex,
    pub re_password: Regex,
    pub re_env_var: Regex,
    pub sanitize: AtomicBool,
}

pub static CONSTANTS: LazyLock<Constants> = LazyLock::new(||
    Constants {
        re_credentials: Regex::new(r"((username|password|token)=)[^&]*").unwrap(),
        re_redirect_token: Regex::new(r"(/redirect/[^/]+/)[A-Za-z0-9_-]+").unwrap(),
        re_ipv4: Regex::new(r"\b((25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\b").unwrap(),
        re_url: Regex::new(r"(.*://).*?/(.*)").unwrap(),
        re_password: Regex::new(r"password:\s*(\w+)").unwrap(),
        re_env_var: Regex::new(r"\$\{env:(?P<var>[a-zA-Z_][a-zA-Z0-9_]*)}").unwrap(),
        sanitize: AtomicBool::new(true),
    }
);
