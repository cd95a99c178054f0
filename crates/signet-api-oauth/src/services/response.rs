//! Authorize response generation.
//!
//! Runs only after validation succeeded, a subject is established, and
//! consent (when required) was granted. Code issuance is the last side
//! effect of the request, so a cancelled request never leaves a code
//! behind.

use crate::models::{AuthorizeResponse, ValidatedRequest};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use rand::RngCore;
use signet_core::{
    AuthError, AuthorizationCode, AuthorizationCodeStore, TokenFactory, TokenRequest,
};
use std::sync::Arc;

/// Authorization code length in bytes (256 bits).
const CODE_LENGTH: usize = 32;

/// Authorization code lifetime in seconds.
pub const CODE_TTL_SECS: i64 = 60;

/// Produces the final authorize response for a fully approved request.
#[derive(Clone)]
pub struct ResponseGenerator {
    codes: Arc<dyn AuthorizationCodeStore>,
    tokens: Arc<dyn TokenFactory>,
}

impl ResponseGenerator {
    /// Create the generator.
    pub fn new(codes: Arc<dyn AuthorizationCodeStore>, tokens: Arc<dyn TokenFactory>) -> Self {
        Self { codes, tokens }
    }

    /// A high-entropy URL-safe authorization code.
    fn generate_code() -> String {
        let mut bytes = [0u8; CODE_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Build the success response for the validated request.
    pub async fn create_response(
        &self,
        request: &ValidatedRequest,
    ) -> Result<AuthorizeResponse, AuthError> {
        let subject = request
            .subject
            .as_ref()
            .and_then(|s| s.subject())
            .ok_or_else(|| AuthError::server("no authenticated subject at response generation"))?
            .to_string();
        let auth_time = request.subject.as_ref().and_then(|s| s.auth_time());

        let mut response = AuthorizeResponse::success(
            request.redirect_uri.clone(),
            request.response_mode,
            request.state.clone(),
        );

        if request.response_type.has_code() {
            let code = Self::generate_code();
            self.codes
                .store(
                    &code,
                    AuthorizationCode {
                        client_id: request.client_id.clone(),
                        redirect_uri: request.redirect_uri.clone(),
                        subject: subject.clone(),
                        nonce: request.nonce.clone(),
                        scopes: request.granted_scopes.clone(),
                        auth_time,
                        code_challenge: request.code_challenge.clone(),
                        code_challenge_method: request.code_challenge_method.clone(),
                        is_open_id: request.is_open_id,
                        expires_at: Utc::now() + Duration::seconds(CODE_TTL_SECS),
                    },
                )
                .await
                .map_err(|err| {
                    tracing::error!(client_id = %request.client_id, error = %err, "storing authorization code failed");
                    AuthError::server("authorization code could not be stored")
                })?;
            response.code = Some(code);
        }

        let token_request = TokenRequest {
            client_id: request.client_id.clone(),
            subject,
            scopes: request.granted_scopes.clone(),
            nonce: request.nonce.clone(),
            auth_time,
            access_token: None,
        };

        if request.response_type.has_token() {
            let (token, lifetime) = self
                .tokens
                .create_access_token(&token_request)
                .await
                .map_err(|err| {
                    tracing::error!(client_id = %request.client_id, error = %err, "access token creation failed");
                    AuthError::server("access token could not be created")
                })?;
            response.access_token = Some(token);
            response.token_type = Some("Bearer".to_string());
            response.expires_in = Some(lifetime);
            response.scope = Some(request.granted_scopes.join(" "));
        }

        if request.response_type.has_id_token() {
            let token_request = TokenRequest {
                access_token: response.access_token.clone(),
                ..token_request
            };
            let identity_token = self
                .tokens
                .create_identity_token(&token_request)
                .await
                .map_err(|err| {
                    tracing::error!(client_id = %request.client_id, error = %err, "identity token creation failed");
                    AuthError::server("identity token could not be created")
                })?;
            response.identity_token = Some(identity_token);
        }

        Ok(response)
    }
}
