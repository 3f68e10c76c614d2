use base64::engine::general_purpose;
use base64::Engine;

/// URL-safe base64 of the blake3 hash of `text`.
pub fn encode_base64_hash(text: &str) -> String {
    let hash = blake3::hash(text.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hash.as_bytes())
}

/// Short stable identifier, first 12 base64 chars of the blake3 hash.
pub fn short_hash(text: &str) -> String {
    let mut hash = encode_base64_hash(text);
    hash.truncate(12);
    hash
}

#[cfg(test)]
mod tests {
    use super::{encode_base64_hash, short_hash};

    #[test]
    fn test_hash_is_stable_and_url_safe() {
        let first = encode_base64_hash("alice:token");
        assert_eq!(first, encode_base64_hash("alice:token"));
        assert_ne!(first, encode_base64_hash("bob:token"));
        assert!(!first.contains('+') && !first.contains('/') && !first.contains('='));
        assert_eq!(short_hash("http://origin/1.ts").len(), 12);
    }
}
