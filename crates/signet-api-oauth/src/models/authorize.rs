//! Authorization request and response models.

use signet_auth::ClaimsIdentity;
use signet_core::{Client, Flow, ProtocolError};
use std::collections::BTreeMap;

/// Identity scopes recognized by the authorize endpoint. Everything else
/// is treated as a resource scope.
pub const IDENTITY_SCOPES: &[&str] = &["openid", "profile", "email", "address", "phone"];

/// Response type of an authorize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// `code`
    Code,
    /// `token`
    Token,
    /// `id_token`
    IdToken,
    /// `id_token token`
    IdTokenToken,
    /// `code id_token`
    CodeIdToken,
    /// `code token`
    CodeToken,
    /// `code id_token token`
    CodeIdTokenToken,
}

impl ResponseType {
    /// Parse a space-separated response type, ignoring token order.
    pub fn parse(value: &str) -> Option<Self> {
        let mut code = false;
        let mut token = false;
        let mut id_token = false;
        let mut count = 0usize;
        for part in value.split_whitespace() {
            count += 1;
            match part {
                "code" if !code => code = true,
                "token" if !token => token = true,
                "id_token" if !id_token => id_token = true,
                _ => return None,
            }
        }
        if count == 0 {
            return None;
        }
        Some(match (code, id_token, token) {
            (true, false, false) => Self::Code,
            (false, false, true) => Self::Token,
            (false, true, false) => Self::IdToken,
            (false, true, true) => Self::IdTokenToken,
            (true, true, false) => Self::CodeIdToken,
            (true, false, true) => Self::CodeToken,
            (true, true, true) => Self::CodeIdTokenToken,
            (false, false, false) => return None,
        })
    }

    /// Whether an authorization code is issued.
    pub fn has_code(&self) -> bool {
        matches!(
            self,
            Self::Code | Self::CodeIdToken | Self::CodeToken | Self::CodeIdTokenToken
        )
    }

    /// Whether an access token is issued from the front channel.
    pub fn has_token(&self) -> bool {
        matches!(
            self,
            Self::Token | Self::IdTokenToken | Self::CodeToken | Self::CodeIdTokenToken
        )
    }

    /// Whether an identity token is issued from the front channel.
    pub fn has_id_token(&self) -> bool {
        matches!(
            self,
            Self::IdToken | Self::IdTokenToken | Self::CodeIdToken | Self::CodeIdTokenToken
        )
    }

    /// The client flow this response type belongs to.
    pub fn required_flow(&self) -> Flow {
        match self {
            Self::Code => Flow::AuthorizationCode,
            Self::Token | Self::IdToken | Self::IdTokenToken => Flow::Implicit,
            Self::CodeIdToken | Self::CodeToken | Self::CodeIdTokenToken => Flow::Hybrid,
        }
    }

    /// Default response mode for this response type.
    pub fn default_response_mode(&self) -> ResponseMode {
        if *self == Self::Code {
            ResponseMode::Query
        } else {
            ResponseMode::Fragment
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Code => "code",
            Self::Token => "token",
            Self::IdToken => "id_token",
            Self::IdTokenToken => "id_token token",
            Self::CodeIdToken => "code id_token",
            Self::CodeToken => "code token",
            Self::CodeIdTokenToken => "code id_token token",
        };
        write!(f, "{s}")
    }
}

/// Transport for the authorize response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Parameters in the redirect query string.
    Query,
    /// Parameters in the redirect fragment.
    Fragment,
    /// Parameters in an auto-posting HTML form.
    FormPost,
}

impl ResponseMode {
    /// Parse a `response_mode` parameter value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "fragment" => Some(Self::Fragment),
            "form_post" => Some(Self::FormPost),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::FormPost => "form_post",
        };
        write!(f, "{s}")
    }
}

/// An authorize request after protocol (and later client) validation.
///
/// Owned exclusively by the state machine for the duration of one
/// authorize call. The raw parameter map is retained so the original
/// authorize URL can be reconstructed for login redirects.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// Resolved client; populated by client validation.
    pub client: Option<Client>,
    /// Requested client id.
    pub client_id: String,
    /// Exact-match validated redirect URI.
    pub redirect_uri: String,
    /// Parsed response type.
    pub response_type: ResponseType,
    /// Concrete response mode (explicit or derived).
    pub response_mode: ResponseMode,
    /// All requested scopes.
    pub requested_scopes: Vec<String>,
    /// Identity scopes among the requested set; populated by client
    /// validation.
    pub identity_scopes: Vec<String>,
    /// Resource scopes among the requested set; populated by client
    /// validation.
    pub resource_scopes: Vec<String>,
    /// Scopes the user granted; starts as the requested set and may be
    /// narrowed by consent.
    pub granted_scopes: Vec<String>,
    /// Whether `openid` was requested.
    pub is_open_id: bool,
    /// Opaque client state, echoed on every client-bound response.
    pub state: Option<String>,
    /// OIDC nonce.
    pub nonce: Option<String>,
    /// Remaining prompt values. Cleared entries do not reappear in the
    /// reconstructed authorize URL.
    pub prompt: Vec<String>,
    /// Maximum acceptable session age in seconds.
    pub max_age: Option<i64>,
    /// Acr values after idp/tenant hint extraction.
    pub acr_values: Vec<String>,
    /// Identity provider hint from `acr_values` (`idp:` prefix).
    pub idp_hint: Option<String>,
    /// Tenant hint from `acr_values` (`tenant:` prefix).
    pub tenant: Option<String>,
    /// Username hint.
    pub login_hint: Option<String>,
    /// UI locales hint.
    pub ui_locales: Option<String>,
    /// Display mode hint.
    pub display_mode: Option<String>,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE code challenge method.
    pub code_challenge_method: Option<String>,
    /// Authenticated subject; established before the response phase.
    pub subject: Option<ClaimsIdentity>,
    /// Raw parameters as received.
    pub raw: BTreeMap<String, String>,
}

impl ValidatedRequest {
    /// The original query string, re-encoded from the retained raw map.
    pub fn query_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.raw {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(&urlencoding::encode(key));
            out.push('=');
            out.push_str(&urlencoding::encode(value));
        }
        out
    }

    /// Absolute authorize URL that re-enters this flow.
    pub fn authorize_url(&self, public_origin: &str) -> String {
        format!(
            "{}/connect/authorize?{}",
            public_origin.trim_end_matches('/'),
            self.query_string()
        )
    }

    /// Remove prompt values from the request and its raw form so the
    /// reconstructed authorize URL cannot re-trigger a login loop.
    pub fn clear_prompt(&mut self) {
        self.prompt.clear();
        self.raw.remove("prompt");
    }
}

/// The authorize response envelope: either a success payload or a
/// protocol error, both delivered via the validated response mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeResponse {
    /// Destination redirect URI.
    pub redirect_uri: String,
    /// Transport for the parameters.
    pub response_mode: ResponseMode,
    /// Whether this is an error response.
    pub is_error: bool,
    /// Protocol error code, when `is_error`.
    pub error: Option<ProtocolError>,
    /// Error description, when `is_error`.
    pub error_description: Option<String>,
    /// Authorization code.
    pub code: Option<String>,
    /// Access token.
    pub access_token: Option<String>,
    /// Access token type.
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Identity token.
    pub identity_token: Option<String>,
    /// Granted scopes, echoed when a token is issued.
    pub scope: Option<String>,
    /// Echoed client state.
    pub state: Option<String>,
}

impl AuthorizeResponse {
    /// An error response.
    pub fn error(
        redirect_uri: impl Into<String>,
        response_mode: ResponseMode,
        error: ProtocolError,
        state: Option<String>,
    ) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            response_mode,
            is_error: true,
            error: Some(error),
            error_description: None,
            code: None,
            access_token: None,
            token_type: None,
            expires_in: None,
            identity_token: None,
            scope: None,
            state,
        }
    }

    /// A success response skeleton.
    pub fn success(
        redirect_uri: impl Into<String>,
        response_mode: ResponseMode,
        state: Option<String>,
    ) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            response_mode,
            is_error: false,
            error: None,
            error_description: None,
            code: None,
            access_token: None,
            token_type: None,
            expires_in: None,
            identity_token: None,
            scope: None,
            state,
        }
    }

    /// The response parameters in wire order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.is_error {
            if let Some(error) = self.error {
                params.push(("error", error.to_string()));
            }
            if let Some(description) = &self.error_description {
                params.push(("error_description", description.clone()));
            }
        } else {
            if let Some(code) = &self.code {
                params.push(("code", code.clone()));
            }
            if let Some(token) = &self.access_token {
                params.push(("access_token", token.clone()));
            }
            if let Some(token_type) = &self.token_type {
                params.push(("token_type", token_type.clone()));
            }
            if let Some(expires_in) = self.expires_in {
                params.push(("expires_in", expires_in.to_string()));
            }
            if let Some(identity_token) = &self.identity_token {
                params.push(("id_token", identity_token.clone()));
            }
            if let Some(scope) = &self.scope {
                params.push(("scope", scope.clone()));
            }
        }
        if let Some(state) = &self.state {
            params.push(("state", state.clone()));
        }
        params
    }

    /// The redirect URL for query and fragment modes.
    pub fn redirect_url(&self) -> String {
        let encoded = self
            .params()
            .into_iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = match self.response_mode {
            ResponseMode::Fragment => '#',
            _ if self.redirect_uri.contains('?') => '&',
            _ => '?',
        };
        format!("{}{separator}{encoded}", self.redirect_uri)
    }

    /// An auto-posting HTML form for `form_post` mode.
    pub fn form_post_html(&self) -> String {
        let fields = self
            .params()
            .into_iter()
            .map(|(k, v)| {
                format!(
                    "<input type=\"hidden\" name=\"{k}\" value=\"{}\" />",
                    escape_html(&v)
                )
            })
            .collect::<Vec<_>>()
            .join("\n      ");
        format!(
            "<!DOCTYPE html>\n<html>\n  <head><title>Submit this form</title></head>\n  <body onload=\"document.forms[0].submit()\">\n    <form method=\"post\" action=\"{}\">\n      {fields}\n    </form>\n    <noscript><button type=\"submit\" form=\"\">Continue</button></noscript>\n  </body>\n</html>",
            escape_html(&self.redirect_uri)
        )
    }
}

/// Minimal HTML attribute/text escaping for the form-post payload.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
