//! Anti-forgery tokens for state-changing POSTs.
//!
//! Double-submit pattern: the token travels in hidden form fields while
//! the HMAC binds it to the browser's session id cookie, so a token
//! harvested from one session fails in another. Token format is
//! `{timestamp}:{random}` with a separate hex HMAC-SHA256 signature.

use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Token expiry in seconds.
const TOKEN_EXPIRY_SECONDS: i64 = 600;

/// Clock skew tolerance in seconds.
const SKEW_SECONDS: i64 = 5;

/// A token/signature pair embedded in a form as hidden fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiForgeryToken {
    /// `{timestamp}:{random_hex}`.
    pub token: String,
    /// Hex HMAC-SHA256 over `{session_id}:{token}`.
    pub signature: String,
}

/// Issues and validates anti-forgery tokens with a process-lifetime
/// secret.
#[derive(Clone)]
pub struct AntiForgery {
    secret: Vec<u8>,
}

impl std::fmt::Debug for AntiForgery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiForgery").finish_non_exhaustive()
    }
}

impl AntiForgery {
    /// Create the service. The secret must be independent of the cookie
    /// protection key.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generate a token bound to `session_id`.
    pub fn generate(&self, session_id: &str) -> AntiForgeryToken {
        let timestamp = chrono::Utc::now().timestamp();
        let mut random_bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut random_bytes);
        let token = format!("{timestamp}:{}", hex::encode(random_bytes));
        let signature = self.compute(session_id, &token);
        AntiForgeryToken { token, signature }
    }

    /// Validate a submitted token against the session id from the
    /// request cookie. Checks signature, format, and expiry.
    pub fn validate(&self, session_id: &str, token: &str, signature: &str) -> bool {
        let expected = self.compute(session_id, token);
        if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
            return false;
        }

        let Some((timestamp, _)) = token.split_once(':') else {
            return false;
        };
        let Ok(timestamp) = timestamp.parse::<i64>() else {
            return false;
        };

        let age = chrono::Utc::now().timestamp() - timestamp;
        (-SKEW_SECONDS..=TOKEN_EXPIRY_SECONDS).contains(&age)
    }

    fn compute(&self, session_id: &str, token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(session_id.as_bytes());
        mac.update(b":");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
