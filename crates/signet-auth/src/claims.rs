//! Claims bag and identity model.
//!
//! Claims are an ordered sequence of `(claim_type, value, issuer)`
//! triples. Lookups by type return the first match; typed accessors wrap
//! the string-keyed bag so callers never branch on raw claim types.

use serde::{Deserialize, Serialize};

/// Well-known claim types used by the authentication flow.
pub mod claim_types {
    /// Subject identifier.
    pub const SUBJECT: &str = "sub";
    /// Display name.
    pub const NAME: &str = "name";
    /// Unix time of the authentication event.
    pub const AUTH_TIME: &str = "auth_time";
    /// Identity provider that authenticated the session.
    pub const IDENTITY_PROVIDER: &str = "idp";
    /// Authentication method reference.
    pub const AUTH_METHOD: &str = "amr";
    /// Provider-scoped user id of a not-yet-mapped external login.
    pub const EXTERNAL_PROVIDER_USER_ID: &str = "external_provider_user_id";
    /// Absolute URL a partial sign-in resumes at.
    pub const PARTIAL_LOGIN_RETURN_URL: &str = "partial_login_return_url";
    /// Prefix of the claim mapping a resume id back to its sign-in id.
    /// The full claim type is `partial_login_resume_id/<resume_id>`.
    pub const PARTIAL_LOGIN_RESUME_ID_PREFIX: &str = "partial_login_resume_id/";
}

/// Issuer recorded on claims produced by this server.
pub const LOCAL_ISSUER: &str = "signet";

/// Identity provider name for username/password sign-ins.
pub const LOCAL_IDENTITY_PROVIDER: &str = "local";

/// A single claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type, e.g. `sub`.
    pub claim_type: String,
    /// Claim value.
    pub value: String,
    /// Issuer of the claim.
    pub issuer: String,
}

impl Claim {
    /// A claim issued by this server.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            issuer: LOCAL_ISSUER.to_string(),
        }
    }

    /// A claim carrying its original external issuer.
    pub fn with_issuer(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            issuer: issuer.into(),
        }
    }
}

/// An authenticated identity: a claims bag plus the authentication
/// scheme it was established under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    /// Authentication scheme (primary, external, partial).
    pub scheme: String,
    /// Ordered claims.
    pub claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// An identity with no claims yet.
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            claims: Vec::new(),
        }
    }

    /// An identity from an existing claim set.
    pub fn with_claims(scheme: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            scheme: scheme.into(),
            claims,
        }
    }

    /// First claim of the given type.
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    /// First claim value of the given type.
    pub fn value_of(&self, claim_type: &str) -> Option<&str> {
        self.find_first(claim_type).map(|c| c.value.as_str())
    }

    /// Append a claim.
    pub fn add(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Remove every claim of the given type.
    pub fn remove(&mut self, claim_type: &str) {
        self.claims.retain(|c| c.claim_type != claim_type);
    }

    /// Subject identifier.
    pub fn subject(&self) -> Option<&str> {
        self.value_of(claim_types::SUBJECT)
    }

    /// Display name, falling back to the subject.
    pub fn name(&self) -> Option<&str> {
        self.value_of(claim_types::NAME).or_else(|| self.subject())
    }

    /// Unix time of the authentication event.
    pub fn auth_time(&self) -> Option<i64> {
        self.value_of(claim_types::AUTH_TIME)?.parse().ok()
    }

    /// Identity provider that authenticated this session.
    pub fn identity_provider(&self) -> Option<&str> {
        self.value_of(claim_types::IDENTITY_PROVIDER)
    }

    /// Whether this identity came from an external provider that has not
    /// yet been mapped to a local account.
    pub fn is_unmapped_external(&self) -> bool {
        self.find_first(claim_types::EXTERNAL_PROVIDER_USER_ID)
            .is_some()
    }

    /// The resume claim `partial_login_resume_id/<resume_id>`, if present.
    pub fn resume_claim(&self, resume_id: &str) -> Option<&Claim> {
        let wanted = format!("{}{resume_id}", claim_types::PARTIAL_LOGIN_RESUME_ID_PREFIX);
        self.find_first(&wanted)
    }
}
