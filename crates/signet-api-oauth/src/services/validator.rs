//! Authorize request validation.
//!
//! Validation runs in two passes. The protocol pass is stateless: it
//! checks parameter presence, syntax, and length ceilings without
//! touching the client store. The client pass resolves the client and
//! enforces its registration. The split matters for error emission:
//! until the redirect URI is proven to belong to a known client, errors
//! about the client or the redirect target must never redirect.

use crate::models::{ResponseMode, ResponseType, ValidatedRequest, IDENTITY_SCOPES};
use signet_core::{AuthError, ClientStore, ProtocolError};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

const MAX_CLIENT_ID: usize = 100;
const MAX_REDIRECT_URI: usize = 2048;
const MAX_SCOPE: usize = 300;
const MAX_STATE: usize = 512;
const MAX_NONCE: usize = 300;
const MAX_ACR_VALUES: usize = 300;
const MAX_LOGIN_HINT: usize = 100;
const MAX_UI_LOCALES: usize = 100;
const MAX_CODE_CHALLENGE: usize = 128;
const MIN_CODE_CHALLENGE: usize = 43;

/// Two-pass authorize request validator.
#[derive(Clone)]
pub struct RequestValidator {
    clients: Arc<dyn ClientStore>,
}

impl RequestValidator {
    /// Create the validator.
    pub fn new(clients: Arc<dyn ClientStore>) -> Self {
        Self { clients }
    }

    /// Stateless protocol validation. Produces a [`ValidatedRequest`]
    /// with no client bound yet.
    pub fn validate_protocol(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<ValidatedRequest, AuthError> {
        // client_id and redirect_uri first: failures here are unsafe to
        // redirect and classify as user errors.
        let client_id = params
            .get("client_id")
            .map(String::as_str)
            .unwrap_or_default();
        if client_id.is_empty() || client_id.len() > MAX_CLIENT_ID {
            return Err(AuthError::user(
                ProtocolError::InvalidRequest,
                "client_id is missing or malformed",
            ));
        }

        let redirect_uri = params
            .get("redirect_uri")
            .map(String::as_str)
            .unwrap_or_default();
        if redirect_uri.is_empty() || redirect_uri.len() > MAX_REDIRECT_URI {
            return Err(AuthError::user(
                ProtocolError::InvalidRequest,
                "redirect_uri is missing or malformed",
            ));
        }
        let parsed = Url::parse(redirect_uri).map_err(|_| {
            AuthError::user(ProtocolError::InvalidRequest, "redirect_uri is not absolute")
        })?;
        if parsed.cannot_be_a_base() || parsed.fragment().is_some() {
            return Err(AuthError::user(
                ProtocolError::InvalidRequest,
                "redirect_uri is malformed",
            ));
        }

        // From here the redirect target is syntactically sound; protocol
        // failures are safe to return to it once the client checks out.
        let state = match params.get("state") {
            Some(s) if s.len() > MAX_STATE => {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "state exceeds the allowed length",
                ));
            }
            other => other.cloned(),
        };

        let response_type = params
            .get("response_type")
            .and_then(|v| ResponseType::parse(v))
            .ok_or_else(|| {
                AuthError::client(
                    ProtocolError::UnsupportedResponseType,
                    "response_type is missing or not supported",
                )
            })?;

        let response_mode = match params.get("response_mode") {
            None => response_type.default_response_mode(),
            Some(raw) => {
                let mode = ResponseMode::parse(raw).ok_or_else(|| {
                    AuthError::client(
                        ProtocolError::InvalidRequest,
                        "response_mode is not supported",
                    )
                })?;
                // Downgrading an implicit or hybrid response to the query
                // string would leak tokens into logs and referrers.
                if mode == ResponseMode::Query
                    && response_type.default_response_mode() == ResponseMode::Fragment
                {
                    return Err(AuthError::client(
                        ProtocolError::InvalidRequest,
                        "response_mode query is not allowed for this response_type",
                    ));
                }
                mode
            }
        };

        let scope_raw = params.get("scope").map(String::as_str).unwrap_or_default();
        if scope_raw.is_empty() {
            return Err(AuthError::client(
                ProtocolError::InvalidScope,
                "scope is missing",
            ));
        }
        if scope_raw.len() > MAX_SCOPE {
            return Err(AuthError::client(
                ProtocolError::InvalidScope,
                "scope exceeds the allowed length",
            ));
        }
        let requested_scopes: Vec<String> =
            scope_raw.split_whitespace().map(str::to_string).collect();
        let is_open_id = requested_scopes.iter().any(|s| s == "openid");
        if response_type.has_id_token() && !is_open_id {
            return Err(AuthError::client(
                ProtocolError::InvalidScope,
                "id_token requests require the openid scope",
            ));
        }

        let nonce = match params.get("nonce") {
            Some(n) if n.len() > MAX_NONCE => {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "nonce exceeds the allowed length",
                ));
            }
            other => other.cloned(),
        };
        if response_type.has_id_token() && nonce.is_none() {
            return Err(AuthError::client(
                ProtocolError::InvalidRequest,
                "nonce is required when id_token is requested from the front channel",
            ));
        }

        let prompt: Vec<String> = params
            .get("prompt")
            .map(|p| p.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        if prompt.iter().any(|p| p == "none") && prompt.len() > 1 {
            return Err(AuthError::client(
                ProtocolError::InvalidRequest,
                "prompt none cannot be combined with other values",
            ));
        }

        let max_age = match params.get("max_age") {
            None => None,
            Some(raw) => Some(raw.parse::<i64>().ok().filter(|v| *v >= 0).ok_or_else(
                || AuthError::client(ProtocolError::InvalidRequest, "max_age is malformed"),
            )?),
        };

        let mut acr_values = Vec::new();
        let mut idp_hint = None;
        let mut tenant = None;
        if let Some(raw) = params.get("acr_values") {
            if raw.len() > MAX_ACR_VALUES {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "acr_values exceeds the allowed length",
                ));
            }
            for value in raw.split_whitespace() {
                if let Some(idp) = value.strip_prefix("idp:") {
                    idp_hint = Some(idp.to_string());
                } else if let Some(t) = value.strip_prefix("tenant:") {
                    tenant = Some(t.to_string());
                } else {
                    acr_values.push(value.to_string());
                }
            }
        }

        let login_hint = match params.get("login_hint") {
            Some(h) if h.len() > MAX_LOGIN_HINT => {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "login_hint exceeds the allowed length",
                ));
            }
            other => other.cloned(),
        };
        let ui_locales = match params.get("ui_locales") {
            Some(l) if l.len() > MAX_UI_LOCALES => {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "ui_locales exceeds the allowed length",
                ));
            }
            other => other.cloned(),
        };

        let code_challenge = params.get("code_challenge").cloned();
        let code_challenge_method = params.get("code_challenge_method").cloned();
        if let Some(challenge) = &code_challenge {
            if challenge.len() < MIN_CODE_CHALLENGE || challenge.len() > MAX_CODE_CHALLENGE {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "code_challenge must be between 43 and 128 characters",
                ));
            }
            if code_challenge_method.as_deref().unwrap_or("S256") != "S256" {
                return Err(AuthError::client(
                    ProtocolError::InvalidRequest,
                    "only the S256 code_challenge_method is supported",
                ));
            }
        } else if code_challenge_method.is_some() {
            return Err(AuthError::client(
                ProtocolError::InvalidRequest,
                "code_challenge_method requires code_challenge",
            ));
        }

        Ok(ValidatedRequest {
            client: None,
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            response_type,
            response_mode,
            requested_scopes: requested_scopes.clone(),
            identity_scopes: Vec::new(),
            resource_scopes: Vec::new(),
            granted_scopes: requested_scopes,
            is_open_id,
            state,
            nonce,
            prompt,
            max_age,
            acr_values,
            idp_hint,
            tenant,
            login_hint,
            ui_locales,
            display_mode: params.get("display").cloned(),
            code_challenge,
            code_challenge_method,
            subject: None,
            raw: params.clone(),
        })
    }

    /// Resolve and bind the client, enforcing its registration.
    ///
    /// Unknown clients and unregistered redirect URIs stay user errors;
    /// once both check out, the remaining failures are safe to redirect.
    pub async fn validate_client(&self, request: &mut ValidatedRequest) -> Result<(), AuthError> {
        let client = self
            .clients
            .find_enabled(&request.client_id)
            .await
            .map_err(|err| {
                tracing::error!(client_id = %request.client_id, error = %err, "client store lookup failed");
                AuthError {
                    error_type: signet_core::ErrorType::User,
                    error: ProtocolError::ServerError,
                    description: Some("client lookup failed".to_string()),
                }
            })?
            .ok_or_else(|| {
                tracing::warn!(
                    target: "security",
                    client_id = %request.client_id,
                    "authorize request for unknown or disabled client"
                );
                AuthError::user(ProtocolError::UnauthorizedClient, "unknown or disabled client")
            })?;

        if !client.redirect_uris.iter().any(|u| u == &request.redirect_uri) {
            tracing::warn!(
                target: "security",
                client_id = %client.client_id,
                redirect_uri = %request.redirect_uri,
                "redirect_uri is not registered for client"
            );
            return Err(AuthError::user(
                ProtocolError::InvalidRequest,
                "redirect_uri is not registered for this client",
            ));
        }

        if request.response_type.required_flow() != client.flow {
            return Err(AuthError::client(
                ProtocolError::UnauthorizedClient,
                "client is not authorized for this response_type",
            ));
        }

        if !client.allows_scopes(request.requested_scopes.iter().map(String::as_str)) {
            return Err(AuthError::client(
                ProtocolError::InvalidScope,
                "requested scope is not allowed for this client",
            ));
        }

        let (identity, resource): (Vec<String>, Vec<String>) = request
            .requested_scopes
            .iter()
            .cloned()
            .partition(|s| IDENTITY_SCOPES.contains(&s.as_str()));
        request.identity_scopes = identity;
        request.resource_scopes = resource;
        request.client = Some(client);
        Ok(())
    }
}
