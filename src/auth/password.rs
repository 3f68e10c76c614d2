use crate::utils::crypto_utils::random_bytes;
use rand::distr::Alphanumeric;
use rand::Rng;
use shared::error::{info_err, GatewayError};

const ARGON2_PREFIX: &str = "$argon2";
const GENERATED_PASSWORD_LEN: usize = 16;

pub fn hash_password(password: &str) -> Result<String, GatewayError> {
    let salt: [u8; 16] = random_bytes();
    let config = argon2::Config {
        variant: argon2::Variant::Argon2id,
        ..argon2::Config::default()
    };
    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|err| info_err!("Failed to hash password: {err}"))
}

pub fn is_password_hash(value: &str) -> bool {
    value.starts_with(ARGON2_PREFIX)
}

/// Checks `password` against an argon2 hash or, for config defined users, plain text.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if is_password_hash(stored) {
        argon2::verify_encoded(stored, password.as_bytes()).unwrap_or(false)
    } else {
        constant_time_eq(password.as_bytes(), stored.as_bytes())
    }
}

/// [`verify_password`] for async callers, hashes are checked on the blocking pool.
pub async fn verify_password_async(password: &str, stored: &str) -> bool {
    if !is_password_hash(stored) {
        return verify_password(password, stored);
    }
    let password = password.to_string();
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .unwrap_or(false)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{generate_password, hash_password, is_password_hash, verify_password, verify_password_async};

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret").unwrap();
        assert!(is_password_hash(&hash));
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("Secret", &hash));
    }

    #[tokio::test]
    async fn test_verify_on_blocking_pool() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password_async("secret", &hash).await);
        assert!(!verify_password_async("wrong", &hash).await);
        assert!(verify_password_async("plain", "plain").await);
    }

    #[test]
    fn test_plain_password() {
        assert!(verify_password("secret", "secret"));
        assert!(!verify_password("secret", "secret2"));
        assert!(!verify_password("", "secret"));
    }

    #[test]
    fn test_generate_password() {
        let pwd = generate_password();
        assert_eq!(pwd.len(), 16);
        assert!(pwd.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(pwd, generate_password());
    }
}
