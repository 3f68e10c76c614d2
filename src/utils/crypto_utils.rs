use aes::Aes128;
use base64::{engine::general_purpose, Engine as _};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use rand::{rngs::OsRng, RngCore, TryRngCore};
use shared::error::{info_err, GatewayError};
use zeroize::Zeroize;

pub const IV_LEN: usize = 16;
pub const MAC_LEN: usize = 32;
const CIPHER_KEY_LEN: usize = 16;
const KEY_MATERIAL_LEN: usize = CIPHER_KEY_LEN + MAC_LEN;
// Fixed so that keys derived from the same secret survive restarts.
const KEY_SALT: &[u8] = b"tulipgate.token.keys.v1";

// AES-CTR (compatible with OpenSSL's aes_128_ctr)
type Aes128Ctr = Ctr128BE<Aes128>;

pub fn encode_base64_string(input: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(input)
}

pub fn decode_base64_string(input: &str) -> Option<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD.decode(input).ok()
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    if OsRng.try_fill_bytes(&mut buf).is_err() {
        rand::rng().fill_bytes(&mut buf);
    }
    buf
}

/// Cipher and MAC key derived from the configured secret.
pub struct SealKeys {
    cipher_key: [u8; CIPHER_KEY_LEN],
    mac_key: [u8; MAC_LEN],
}

impl SealKeys {
    pub fn derive(secret: &str) -> Result<Self, GatewayError> {
        let config = argon2::Config {
            variant: argon2::Variant::Argon2id,
            hash_length: u32::try_from(KEY_MATERIAL_LEN).unwrap_or(48),
            ..argon2::Config::default()
        };
        let mut material = argon2::hash_raw(secret.as_bytes(), KEY_SALT, &config)
            .map_err(|err| info_err!("Failed to derive token keys: {err}"))?;
        if material.len() != KEY_MATERIAL_LEN {
            material.zeroize();
            return Err(info_err!("Failed to derive token keys: unexpected key length"));
        }
        let mut keys = Self { cipher_key: [0u8; CIPHER_KEY_LEN], mac_key: [0u8; MAC_LEN] };
        keys.cipher_key.copy_from_slice(&material[..CIPHER_KEY_LEN]);
        keys.mac_key.copy_from_slice(&material[CIPHER_KEY_LEN..]);
        material.zeroize();
        Ok(keys)
    }

    fn mac(&self, data: &[u8]) -> blake3::Hash {
        blake3::keyed_hash(&self.mac_key, data)
    }
}

impl Drop for SealKeys {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.mac_key.zeroize();
    }
}

/// Encrypts `plain` with a fresh IV and appends a keyed MAC.
/// Output: base64url(IV || ciphertext || MAC).
pub fn seal(keys: &SealKeys, plain: &[u8]) -> Result<String, GatewayError> {
    let iv: [u8; IV_LEN] = random_bytes();

    let mut out = Vec::with_capacity(IV_LEN + plain.len() + MAC_LEN);
    out.extend_from_slice(&iv);
    out.extend_from_slice(plain);
    let mut cipher = Aes128Ctr::new_from_slices(&keys.cipher_key, &iv)
        .map_err(|_err| info_err!("Can't create cipher"))?;
    cipher.apply_keystream(&mut out[IV_LEN..]);

    let tag = keys.mac(&out);
    out.extend_from_slice(tag.as_bytes());
    Ok(encode_base64_string(&out))
}

/// Reverses [`seal`]. Fails on bad encoding, short input or a MAC mismatch.
pub fn open(keys: &SealKeys, encoded: &str) -> Result<Vec<u8>, GatewayError> {
    let data = decode_base64_string(encoded).ok_or_else(|| info_err!("Can't decode base64"))?;
    if data.len() < IV_LEN + MAC_LEN {
        return Err(info_err!("Token too short to contain IV and MAC"));
    }
    let (sealed, tag) = data.split_at(data.len() - MAC_LEN);
    let mut tag_bytes = [0u8; MAC_LEN];
    tag_bytes.copy_from_slice(tag);
    // blake3::Hash equality is constant time
    if keys.mac(sealed) != blake3::Hash::from(tag_bytes) {
        return Err(info_err!("Token MAC mismatch"));
    }

    let (iv, ciphertext) = sealed.split_at(IV_LEN);
    let mut buf = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new_from_slices(&keys.cipher_key, iv)
        .map_err(|_err| info_err!("Can't create decrypt cipher"))?;
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::{decode_base64_string, encode_base64_string, open, seal, SealKeys, IV_LEN, MAC_LEN};

    #[test]
    fn test_seal_open() {
        let keys = SealKeys::derive("0123456789abcdef").unwrap();
        let sealed = seal(&keys, b"http://origin/live/1.ts").unwrap();
        assert_eq!(open(&keys, &sealed).unwrap(), b"http://origin/live/1.ts");

        // random iv per call
        let other = seal(&keys, b"http://origin/live/1.ts").unwrap();
        assert_ne!(sealed, other);
        assert_eq!(decode_base64_string(&sealed).unwrap().len(), IV_LEN + 23 + MAC_LEN);
    }

    #[test]
    fn test_open_with_other_key_fails() {
        let keys = SealKeys::derive("0123456789abcdef").unwrap();
        let other = SealKeys::derive("fedcba9876543210").unwrap();
        let sealed = seal(&keys, b"payload").unwrap();
        assert!(open(&other, &sealed).is_err());
    }

    #[test]
    fn test_open_detects_tampering() {
        let keys = SealKeys::derive("0123456789abcdef").unwrap();
        let raw = decode_base64_string(&seal(&keys, b"payload").unwrap()).unwrap();
        for idx in [0, IV_LEN, raw.len() - 1] {
            let mut tampered = raw.clone();
            tampered[idx] ^= 0x01;
            assert!(open(&keys, &encode_base64_string(&tampered)).is_err());
        }
        assert!(open(&keys, "not base64 !").is_err());
        assert!(open(&keys, &encode_base64_string(&raw[..IV_LEN])).is_err());
    }
}
