//! Cookie plumbing: names, header parsing/formatting, and the typed
//! cookie services (message cookies, session id, last username).
//!
//! Controllers never touch `Set-Cookie` strings directly; they collect
//! the values produced here into the handler outcome.

use crate::envelope::{EnvelopeError, MessageProtector};
use crate::messages::{SignInMessage, SignOutMessage};
use axum::http::{header::COOKIE, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Primary authentication cookie.
pub const PRIMARY_COOKIE: &str = "signet.auth";
/// Temporary external-provider identity cookie.
pub const EXTERNAL_COOKIE: &str = "signet.external";
/// Partial sign-in cookie. Distinct from the primary scheme so a partial
/// session can never satisfy the authorize endpoint.
pub const PARTIAL_COOKIE: &str = "signet.partial";
/// External challenge round-trip properties cookie.
pub const CHALLENGE_COOKIE: &str = "signet.challenge";
/// Browser session id cookie.
pub const SESSION_COOKIE: &str = "signet.session";
/// Remembered username hint cookie.
pub const USERNAME_COOKIE: &str = "signet.username";
/// Prefix for sign-in message cookies; the random id is appended.
pub const SIGNIN_COOKIE_PREFIX: &str = "signet.signin.";
/// Prefix for sign-out message cookies; the random id is appended.
pub const SIGNOUT_COOKIE_PREFIX: &str = "signet.signout.";

/// Lifetime of the remembered-username cookie.
const USERNAME_COOKIE_MAX_AGE: i64 = 90 * 24 * 60 * 60;

/// Parse the request `Cookie` header into a name → value map.
pub fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let Some(value) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) else {
        return map;
    };
    for part in value.split(';') {
        if let Some((name, value)) = part.trim().split_once('=') {
            map.insert(name.to_string(), value.to_string());
        }
    }
    map
}

/// Build a `Set-Cookie` value. `max_age = None` yields a session cookie.
pub fn set_cookie(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    match max_age {
        Some(age) => format!(
            "{name}={value}; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age={age}"
        ),
        None => format!("{name}={value}; HttpOnly{secure_flag}; SameSite=Lax; Path=/"),
    }
}

/// Build a `Set-Cookie` value that clears the cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("{name}=; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age=0")
}

/// A 128-bit random id, hex-encoded.
pub fn random_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Sealed sign-in/sign-out message cookies, keyed by random id.
#[derive(Clone)]
pub struct MessageCookies {
    protector: Arc<MessageProtector>,
    max_age: Duration,
    secure: bool,
}

impl MessageCookies {
    /// Create the message cookie service.
    pub fn new(protector: Arc<MessageProtector>, max_age_secs: i64, secure: bool) -> Self {
        Self {
            protector,
            max_age: Duration::seconds(max_age_secs),
            secure,
        }
    }

    fn signin_name(id: &str) -> String {
        format!("{SIGNIN_COOKIE_PREFIX}{id}")
    }

    fn signout_name(id: &str) -> String {
        format!("{SIGNOUT_COOKIE_PREFIX}{id}")
    }

    /// Seal a sign-in message under `id`. Re-issuing overwrites.
    pub fn write_signin(
        &self,
        id: &str,
        message: &SignInMessage,
    ) -> Result<String, EnvelopeError> {
        let name = Self::signin_name(id);
        let blob = self.protector.seal(&name, message)?;
        Ok(set_cookie(
            &name,
            &blob,
            Some(self.max_age.num_seconds()),
            self.secure,
        ))
    }

    /// Read and validate the sign-in message for `id`. Expired or
    /// unreadable messages are absent.
    pub fn read_signin(
        &self,
        cookies: &BTreeMap<String, String>,
        id: &str,
    ) -> Option<SignInMessage> {
        let name = Self::signin_name(id);
        let message: SignInMessage = self.protector.open(&name, cookies.get(&name)?)?;
        if message.is_expired(self.max_age) {
            tracing::debug!(signin_id = id, "sign-in message expired");
            return None;
        }
        Some(message)
    }

    /// Clear the sign-in message cookie for `id`.
    pub fn clear_signin(&self, id: &str) -> String {
        clear_cookie(&Self::signin_name(id), self.secure)
    }

    /// Seal a sign-out message under `id`.
    pub fn write_signout(
        &self,
        id: &str,
        message: &SignOutMessage,
    ) -> Result<String, EnvelopeError> {
        let name = Self::signout_name(id);
        let blob = self.protector.seal(&name, message)?;
        Ok(set_cookie(
            &name,
            &blob,
            Some(self.max_age.num_seconds()),
            self.secure,
        ))
    }

    /// Read the sign-out message for `id`.
    pub fn read_signout(
        &self,
        cookies: &BTreeMap<String, String>,
        id: &str,
    ) -> Option<SignOutMessage> {
        let name = Self::signout_name(id);
        self.protector.open(&name, cookies.get(&name)?)
    }

    /// Clear the sign-out message cookie for `id`.
    pub fn clear_signout(&self, id: &str) -> String {
        clear_cookie(&Self::signout_name(id), self.secure)
    }

    /// Clear every message cookie present on the request. Used at logout
    /// and when a new flow restarts for a different client.
    pub fn clear_all(&self, cookies: &BTreeMap<String, String>) -> Vec<String> {
        cookies
            .keys()
            .filter(|name| {
                name.starts_with(SIGNIN_COOKIE_PREFIX) || name.starts_with(SIGNOUT_COOKIE_PREFIX)
            })
            .map(|name| clear_cookie(name, self.secure))
            .collect()
    }
}

/// Browser session id issuance.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    secure: bool,
}

impl SessionCookie {
    /// Create the session cookie service.
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Current session id, if the browser presented one.
    pub fn read(&self, cookies: &BTreeMap<String, String>) -> Option<String> {
        cookies.get(SESSION_COOKIE).cloned()
    }

    /// Issue a fresh session id. Returns the id and its `Set-Cookie`.
    pub fn issue(&self) -> (String, String) {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let id = URL_SAFE_NO_PAD.encode(bytes);
        let header = set_cookie(SESSION_COOKIE, &id, None, self.secure);
        (id, header)
    }

    /// The session id to use for this request, plus a `Set-Cookie` when a
    /// fresh one had to be issued.
    pub fn ensure(&self, cookies: &BTreeMap<String, String>) -> (String, Option<String>) {
        match self.read(cookies) {
            Some(id) => (id, None),
            None => {
                let (id, header) = self.issue();
                (id, Some(header))
            }
        }
    }

    /// Clear the session id cookie.
    pub fn clear(&self) -> String {
        clear_cookie(SESSION_COOKIE, self.secure)
    }
}

/// Remembered username hint for the login form.
#[derive(Debug, Clone)]
pub struct LastUsernameCookie {
    secure: bool,
    enabled: bool,
}

impl LastUsernameCookie {
    /// Create the last-username cookie service. Disabled when
    /// remember-me is not allowed.
    pub fn new(secure: bool, enabled: bool) -> Self {
        Self { secure, enabled }
    }

    /// The remembered username, if any.
    pub fn read(&self, cookies: &BTreeMap<String, String>) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let raw = cookies.get(USERNAME_COOKIE)?;
        let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Remember `username`, or clear the hint when `None`.
    pub fn write(&self, username: Option<&str>) -> Option<String> {
        if !self.enabled {
            return None;
        }
        Some(match username {
            Some(name) => set_cookie(
                USERNAME_COOKIE,
                &URL_SAFE_NO_PAD.encode(name.as_bytes()),
                Some(USERNAME_COOKIE_MAX_AGE),
                self.secure,
            ),
            None => clear_cookie(USERNAME_COOKIE, self.secure),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn protector() -> Arc<MessageProtector> {
        Arc::new(MessageProtector::new(&[3u8; 32]))
    }

    fn cookies_from(header: &str) -> BTreeMap<String, String> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(header).unwrap());
        parse_cookies(&headers)
    }

    fn cookie_value(set_cookie: &str) -> (String, String) {
        let pair = set_cookie.split(';').next().unwrap();
        let (name, value) = pair.split_once('=').unwrap();
        (name.to_string(), value.to_string())
    }

    #[test]
    fn parse_cookies_splits_pairs() {
        let map = cookies_from("a=1; b=2;c=3");
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
        assert_eq!(map.get("b").map(String::as_str), Some("2"));
        assert_eq!(map.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn signin_message_round_trip() {
        let svc = MessageCookies::new(protector(), 300, true);
        let msg = SignInMessage::new("https://id/connect/authorize?client_id=c1");
        let header = svc.write_signin("id1", &msg).unwrap();
        let (name, value) = cookie_value(&header);
        assert_eq!(name, "signet.signin.id1");

        let mut jar = BTreeMap::new();
        jar.insert(name, value);
        assert_eq!(svc.read_signin(&jar, "id1"), Some(msg));
        assert!(svc.read_signin(&jar, "other").is_none());
    }

    #[test]
    fn expired_signin_message_is_absent() {
        let svc = MessageCookies::new(protector(), 300, true);
        let mut msg = SignInMessage::new("https://id/connect/authorize");
        msg.created -= 301;
        let header = svc.write_signin("id1", &msg).unwrap();
        let (name, value) = cookie_value(&header);
        let mut jar = BTreeMap::new();
        jar.insert(name, value);
        assert!(svc.read_signin(&jar, "id1").is_none());
    }

    #[test]
    fn clear_all_targets_only_message_cookies() {
        let svc = MessageCookies::new(protector(), 300, true);
        let jar = cookies_from("signet.signin.a=x; signet.signout.b=y; signet.auth=z");
        let cleared = svc.clear_all(&jar);
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
        assert!(!cleared.iter().any(|c| c.starts_with("signet.auth=")));
    }

    #[test]
    fn session_cookie_is_reused_when_present() {
        let svc = SessionCookie::new(true);
        let jar = cookies_from("signet.session=abc");
        let (id, issued) = svc.ensure(&jar);
        assert_eq!(id, "abc");
        assert!(issued.is_none());

        let (id2, issued2) = svc.ensure(&BTreeMap::new());
        assert!(!id2.is_empty());
        assert!(issued2.is_some());
    }

    #[test]
    fn last_username_round_trip() {
        let svc = LastUsernameCookie::new(true, true);
        let header = svc.write(Some("alice")).unwrap();
        let (name, value) = cookie_value(&header);
        let mut jar = BTreeMap::new();
        jar.insert(name, value);
        assert_eq!(svc.read(&jar), Some("alice".to_string()));
    }

    #[test]
    fn last_username_disabled_reads_nothing() {
        let svc = LastUsernameCookie::new(true, false);
        assert!(svc.write(Some("alice")).is_none());
        let jar = cookies_from("signet.username=YWxpY2U");
        assert!(svc.read(&jar).is_none());
    }
}
