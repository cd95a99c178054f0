//! Authentication cookie issuance.
//!
//! Three cookie schemes exist: primary (a full session), external (a
//! provider identity in transit), and partial (an interrupted sign-in
//! pending more user data). Each scheme has its own cookie, and issuing
//! any of them first clears all three so claims never accumulate across
//! sign-ins.

use crate::claims::ClaimsIdentity;
use crate::cookies::{self, EXTERNAL_COOKIE, PARTIAL_COOKIE, PRIMARY_COOKIE};
use crate::envelope::{EnvelopeError, MessageProtector};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use signet_core::CookieOptions;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Authentication scheme names carried on [`ClaimsIdentity`].
pub mod schemes {
    /// Full interactive session.
    pub const PRIMARY: &str = "primary";
    /// External provider identity awaiting local processing.
    pub const EXTERNAL: &str = "external";
    /// Partial sign-in; cannot satisfy the authorize endpoint.
    pub const PARTIAL: &str = "partial";
}

/// Sealed authentication cookie payload.
#[derive(Debug, Serialize, Deserialize)]
struct Ticket {
    identity: ClaimsIdentity,
    issued: i64,
    /// Absolute unix expiry for persistent cookies; session cookies rely
    /// on the browser.
    expires: Option<i64>,
}

/// Issues and reads the authentication cookies.
#[derive(Clone)]
pub struct AuthCookieIssuer {
    protector: Arc<MessageProtector>,
    options: CookieOptions,
}

impl AuthCookieIssuer {
    /// Create the issuer.
    pub fn new(protector: Arc<MessageProtector>, options: CookieOptions) -> Self {
        Self { protector, options }
    }

    fn cookie_name(scheme: &str) -> &'static str {
        match scheme {
            schemes::EXTERNAL => EXTERNAL_COOKIE,
            schemes::PARTIAL => PARTIAL_COOKIE,
            _ => PRIMARY_COOKIE,
        }
    }

    /// Cookie lifetime in seconds for a sign-in under the given scheme.
    ///
    /// `remember_me` applies only to primary sign-ins: `Some(true)` pins
    /// the remember-me duration, `Some(false)` forces a session cookie,
    /// and `None` follows the server default. Partial and external
    /// cookies are never persistent.
    fn persistence(&self, scheme: &str, remember_me: Option<bool>) -> Option<i64> {
        if scheme != schemes::PRIMARY {
            return None;
        }
        match remember_me {
            Some(true) => Some(self.options.remember_me_duration_secs),
            Some(false) => None,
            None if self.options.is_persistent => Some(self.options.expire_time_to_live_secs),
            None => None,
        }
    }

    /// Issue the cookie for `identity.scheme`, clearing every other
    /// authentication cookie first. Returns the `Set-Cookie` values in
    /// emission order.
    pub fn issue(
        &self,
        identity: &ClaimsIdentity,
        remember_me: Option<bool>,
    ) -> Result<Vec<String>, EnvelopeError> {
        let name = Self::cookie_name(&identity.scheme);
        let max_age = self.persistence(&identity.scheme, remember_me);
        let now = Utc::now().timestamp();
        let ticket = Ticket {
            identity: identity.clone(),
            issued: now,
            expires: max_age.map(|secs| now + secs),
        };
        let blob = self.protector.seal(name, &ticket)?;

        let mut headers: Vec<String> = [PRIMARY_COOKIE, EXTERNAL_COOKIE, PARTIAL_COOKIE]
            .iter()
            .filter(|existing| **existing != name)
            .map(|existing| cookies::clear_cookie(existing, self.options.secure))
            .collect();
        headers.push(cookies::set_cookie(name, &blob, max_age, self.options.secure));
        Ok(headers)
    }

    /// Read the identity for `scheme` from the request cookies. Expired
    /// or unreadable tickets are absent.
    pub fn read(
        &self,
        request_cookies: &BTreeMap<String, String>,
        scheme: &str,
    ) -> Option<ClaimsIdentity> {
        let name = Self::cookie_name(scheme);
        let ticket: Ticket = self.protector.open(name, request_cookies.get(name)?)?;
        if ticket.identity.scheme != scheme {
            return None;
        }
        if let Some(expires) = ticket.expires {
            if Utc::now().timestamp() >= expires {
                return None;
            }
        }
        Some(ticket.identity)
    }

    /// Clear primary, external, and partial cookies.
    pub fn clear_all(&self) -> Vec<String> {
        [PRIMARY_COOKIE, EXTERNAL_COOKIE, PARTIAL_COOKIE]
            .iter()
            .map(|name| cookies::clear_cookie(name, self.options.secure))
            .collect()
    }
}
