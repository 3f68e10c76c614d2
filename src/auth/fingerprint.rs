use std::net::SocketAddr;
use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use crate::auth::Rejection;

const MAX_HEADER_LENGTH: usize = 512;

fn validate_header(value: &str) -> Option<String> {
    let value = value.trim();
    if !value.is_empty() && value.len() <= MAX_HEADER_LENGTH && !value.contains('\0') {
        Some(value.to_string())
    } else {
        None
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).and_then(validate_header)
}

/// Whether proxy headers may override the peer address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientIpSource {
    pub trust_forwarded_headers: bool,
}

/// Client address. With trusted proxy headers: `X-Real-IP`, then the first
/// `X-Forwarded-For` entry, then the peer address. Otherwise the peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: &SocketAddr, source: ClientIpSource) -> String {
    if !source.trust_forwarded_headers {
        return peer.ip().to_string();
    }
    header_value(headers, "x-real-ip")
        .or_else(|| header_value(headers, "x-forwarded-for")
            .and_then(|forwarded| forwarded.split(',').next().and_then(validate_header)))
        .unwrap_or_else(|| peer.ip().to_string())
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Fingerprint {
    pub client_ip: String,
    pub user_agent: String,
}

impl<B> FromRequestParts<B> for Fingerprint
where
    B: Send + Sync,
    ClientIpSource: FromRef<B>,
{
    type Rejection = Rejection;

    async fn from_request_parts(req: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        let ConnectInfo(addr) = ConnectInfo::<SocketAddr>::from_request_parts(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "IP-Addr is missing"))?;

        Ok(Fingerprint {
            client_ip: resolve_client_ip(&req.headers, &addr, ClientIpSource::from_ref(state)),
            user_agent: header_value(&req.headers, axum::http::header::USER_AGENT.as_str()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_client_ip, ClientIpSource};
    use axum::http::{HeaderMap, HeaderValue};
    use std::net::SocketAddr;

    const TRUSTED: ClientIpSource = ClientIpSource { trust_forwarded_headers: true };

    #[test]
    fn test_client_ip_priority() {
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(resolve_client_ip(&headers, &peer, TRUSTED), "10.0.0.1");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        assert_eq!(resolve_client_ip(&headers, &peer, TRUSTED), "203.0.113.7");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.9"));
        assert_eq!(resolve_client_ip(&headers, &peer, TRUSTED), "198.51.100.9");

        headers.insert("x-real-ip", HeaderValue::from_static("  "));
        assert_eq!(resolve_client_ip(&headers, &peer, TRUSTED), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_headers_ignored_by_default() {
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.9"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        assert_eq!(resolve_client_ip(&headers, &peer, ClientIpSource::default()), "10.0.0.1");
    }
}
