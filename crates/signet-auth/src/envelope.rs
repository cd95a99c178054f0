//! AEAD-sealed cookie envelope.
//!
//! Message and authentication cookies carry serde-serialized payloads
//! sealed with AES-256-GCM. The cookie name is bound in as associated
//! data, so a blob pasted into a different cookie fails authentication.
//! Any open failure (bad base64, truncation, MAC mismatch, stale schema)
//! is treated as the cookie being absent.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use thiserror::Error;

/// Nonce size for AES-GCM (96 bits).
const NONCE_SIZE: usize = 12;

/// Key size for AES-256.
const KEY_SIZE: usize = 32;

/// HKDF info label for the cookie-protection key.
const KEY_INFO: &[u8] = b"signet.cookie-protection";

/// Sealing failures. Opening never errors; it reports absence instead.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The cipher rejected the operation.
    #[error("seal failed")]
    Seal,
}

/// Seals and opens cookie payloads. Keys are immutable for the process
/// lifetime; rotation requires redeploy.
#[derive(Clone)]
pub struct MessageProtector {
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for MessageProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageProtector").finish_non_exhaustive()
    }
}

impl MessageProtector {
    /// Derive the protection key from a 32-byte master key.
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Self {
        let hkdf = Hkdf::<Sha256>::new(None, master_key);
        let mut key = [0u8; KEY_SIZE];
        hkdf.expand(KEY_INFO, &mut key)
            .expect("HKDF expand should never fail with valid parameters");
        Self { key }
    }

    /// Seal a payload for the given cookie name. Returns a URL-safe
    /// base64 blob with the nonce prepended.
    pub fn seal<T: Serialize>(&self, cookie_name: &str, value: &T) -> Result<String, EnvelopeError> {
        let plaintext = serde_json::to_vec(value)?;
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| EnvelopeError::Seal)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: cookie_name.as_bytes(),
                },
            )
            .map_err(|_| EnvelopeError::Seal)?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Open a sealed blob for the given cookie name. Returns `None` on
    /// any failure.
    pub fn open<T: DeserializeOwned>(&self, cookie_name: &str, blob: &str) -> Option<T> {
        let raw = URL_SAFE_NO_PAD.decode(blob).ok()?;
        if raw.len() < NONCE_SIZE {
            return None;
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).ok()?;
        let nonce_bytes: [u8; NONCE_SIZE] = raw[..NONCE_SIZE].try_into().ok()?;
        let nonce = Nonce::from(nonce_bytes);

        let plaintext = cipher
            .decrypt(
                &nonce,
                Payload {
                    msg: &raw[NONCE_SIZE..],
                    aad: cookie_name.as_bytes(),
                },
            )
            .ok()?;

        match serde_json::from_slice(&plaintext) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(cookie = cookie_name, error = %err, "sealed cookie payload unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const TEST_KEY: [u8; 32] = [7u8; 32];

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestMessage {
        id: String,
        n: u32,
    }

    fn protector() -> MessageProtector {
        MessageProtector::new(&TEST_KEY)
    }

    #[test]
    fn seal_open_round_trip() {
        let p = protector();
        let value = TestMessage {
            id: "abc".into(),
            n: 7,
        };
        let blob = p.seal("signet.signin.1", &value).unwrap();
        let opened: TestMessage = p.open("signet.signin.1", &blob).unwrap();
        assert_eq!(opened, value);
    }

    #[test]
    fn wrong_cookie_name_fails_authentication() {
        let p = protector();
        let blob = p
            .seal(
                "signet.signin.1",
                &TestMessage {
                    id: "abc".into(),
                    n: 7,
                },
            )
            .unwrap();
        assert!(p.open::<TestMessage>("signet.signin.2", &blob).is_none());
    }

    #[test]
    fn tampered_blob_is_absent() {
        let p = protector();
        let blob = p
            .seal(
                "signet.signin.1",
                &TestMessage {
                    id: "abc".into(),
                    n: 7,
                },
            )
            .unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(&blob).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);
        assert!(p.open::<TestMessage>("signet.signin.1", &tampered).is_none());
    }

    #[test]
    fn garbage_is_absent() {
        let p = protector();
        assert!(p.open::<TestMessage>("signet.signin.1", "not-base64!!").is_none());
        assert!(p.open::<TestMessage>("signet.signin.1", "AAAA").is_none());
    }

    #[test]
    fn different_master_keys_do_not_interoperate() {
        let a = MessageProtector::new(&[1u8; 32]);
        let b = MessageProtector::new(&[2u8; 32]);
        let blob = a
            .seal(
                "signet.signin.1",
                &TestMessage {
                    id: "abc".into(),
                    n: 1,
                },
            )
            .unwrap();
        assert!(b.open::<TestMessage>("signet.signin.1", &blob).is_none());
    }
}
