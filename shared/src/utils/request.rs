use crate::utils::CONSTANTS;
use std::borrow::Cow;
use std::sync::atomic::Ordering;

pub fn set_sanitize_sensitive_info(value: bool) {
    CONSTANTS.sanitize.store(value, Ordering::Relaxed);
}

pub fn sanitize_sensitive_info(query: &str) -> Cow<'_, str> {
    if !CONSTANTS.sanitize.load(Ordering::Relaxed) {
        return Cow::Borrowed(query);
    }

    let mut result = query.to_owned();

    for (re, replacement) in &[
        (&CONSTANTS.re_credentials, "$1***"),
        (&CONSTANTS.re_redirect_token, "$1***"),
        (&CONSTANTS.re_ipv4, "***"),
        (&CONSTANTS.re_url, "$1***/$2"),
        (&CONSTANTS.re_password, "password: ***"),
    ] {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    Cow::Owned(result)
}

pub fn trim_slash(value: &str) -> &str {
    value.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::{sanitize_sensitive_info, trim_slash};

    #[test]
    fn test_sanitize_credentials() {
        let sanitized = sanitize_sensitive_info("/playlist?username=alice&password=secret");
        assert_eq!(sanitized, "/playlist?username=***&password=***");
    }

    #[test]
    fn test_sanitize_redirect_token() {
        let sanitized = sanitize_sensitive_info("GET /redirect/bob/AbC-12_x");
        assert_eq!(sanitized, "GET /redirect/bob/***");
    }

    #[test]
    fn test_sanitize_ip() {
        let sanitized = sanitize_sensitive_info("client 192.168.1.20 rejected");
        assert_eq!(sanitized, "client *** rejected");
    }

    #[test]
    fn test_trim_slash() {
        assert_eq!(trim_slash("http://gw.local/"), "http://gw.local");
    }
}
