use shared::utils::default_connect_timeout_secs;
use std::time::Duration;

pub fn create_client() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .pool_idle_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .connect_timeout(Duration::from_secs(u64::from(default_connect_timeout_secs())))
        .user_agent(concat!("tulipgate/", env!("CARGO_PKG_VERSION")))
}

pub fn is_http_url(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
