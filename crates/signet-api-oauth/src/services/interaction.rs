//! Login and consent interaction decisions.
//!
//! Each decision returns a tagged [`Interaction`]; the controller maps
//! anything other than `Proceed` to a redirect, a view, or an error.
//! Login decisions strictly precede consent decisions, and client
//! validation sits between the two login passes.

use crate::models::{UserConsent, ValidatedRequest};
use chrono::Utc;
use signet_auth::{ClaimsIdentity, SignInMessage, LOCAL_IDENTITY_PROVIDER};
use signet_core::{AuthError, Consent, ConsentStore, ProtocolError, ServerOptions, StoreError};
use std::sync::Arc;

/// Localized message key shown when a consent submission selects no
/// valid scope.
pub const MSG_MUST_CHOOSE_PERMISSION: &str = "must_choose_one_permission";

/// Outcome of one interaction decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Abort with an error.
    Error(AuthError),
    /// Redirect to login carrying this sign-in message.
    Login(SignInMessage),
    /// Show the consent view, optionally with a validation message key.
    Consent(Option<&'static str>),
    /// Continue to the next phase.
    Proceed,
}

/// Decides whether login or consent interaction is required.
#[derive(Clone)]
pub struct InteractionGenerator {
    options: Arc<ServerOptions>,
    consents: Arc<dyn ConsentStore>,
}

impl InteractionGenerator {
    /// Create the generator.
    pub fn new(options: Arc<ServerOptions>, consents: Arc<dyn ConsentStore>) -> Self {
        Self { options, consents }
    }

    /// Build the sign-in message for the current request. The return URL
    /// is the full authorize URL, so completing login re-enters the
    /// state machine.
    fn signin_message(&self, request: &ValidatedRequest) -> SignInMessage {
        let mut message = SignInMessage::new(request.authorize_url(&self.options.public_origin));
        message.client_id = Some(request.client_id.clone());
        message.idp = request.idp_hint.clone();
        message.acr_values = request.acr_values.clone();
        message.tenant = request.tenant.clone();
        message.login_hint = request.login_hint.clone();
        message.display_mode = request.display_mode.clone();
        message.ui_locales = request.ui_locales.clone();
        message
    }

    /// Pre-client login pass.
    pub fn process_login(
        &self,
        request: &mut ValidatedRequest,
        user: Option<&ClaimsIdentity>,
    ) -> Interaction {
        // An explicit prompt wins over an existing session. The prompt is
        // removed from the retained parameters so the post-login re-entry
        // cannot loop.
        if request
            .prompt
            .iter()
            .any(|p| p == "login" || p == "select_account")
        {
            request.clear_prompt();
            return Interaction::Login(self.signin_message(request));
        }

        let Some(user) = user else {
            return Interaction::Login(self.signin_message(request));
        };

        if let Some(max_age) = request.max_age {
            let auth_time = user.auth_time().unwrap_or(0);
            if Utc::now().timestamp() - auth_time > max_age {
                tracing::debug!(client_id = %request.client_id, "session exceeds max_age, re-authenticating");
                return Interaction::Login(self.signin_message(request));
            }
        }

        if let Some(idp) = &request.idp_hint {
            if user.identity_provider() != Some(idp.as_str()) {
                return Interaction::Login(self.signin_message(request));
            }
        }

        Interaction::Proceed
    }

    /// Post-client login pass: enforce client-specific sign-in rules
    /// that require the resolved registration.
    pub fn process_client_login(
        &self,
        request: &ValidatedRequest,
        user: &ClaimsIdentity,
    ) -> Interaction {
        let Some(client) = &request.client else {
            return Interaction::Error(AuthError::server("client not bound before login check"));
        };

        let current_idp = user.identity_provider().unwrap_or(LOCAL_IDENTITY_PROVIDER);
        if !client.allows_identity_provider(current_idp) {
            tracing::debug!(
                client_id = %client.client_id,
                idp = %current_idp,
                "session idp not allowed for client, re-authenticating"
            );
            return Interaction::Login(self.signin_message(request));
        }
        if current_idp == LOCAL_IDENTITY_PROVIDER && !client.enable_local_login {
            return Interaction::Login(self.signin_message(request));
        }

        Interaction::Proceed
    }

    /// Consent pass. A submission, when present, came from the consent
    /// form POST; its scopes must stay within the requested set.
    pub async fn process_consent(
        &self,
        request: &mut ValidatedRequest,
        user: &ClaimsIdentity,
        submission: Option<&UserConsent>,
    ) -> Result<Interaction, StoreError> {
        let Some(client) = request.client.clone() else {
            return Ok(Interaction::Error(AuthError::server(
                "client not bound before consent check",
            )));
        };

        if !client.require_consent {
            return Ok(Interaction::Proceed);
        }

        let subject = user.subject().unwrap_or_default().to_string();
        if submission.is_none() && client.allow_remember_consent {
            if let Some(remembered) = self.consents.load(&subject, &client.client_id).await? {
                if remembered.covers(request.requested_scopes.iter().map(String::as_str)) {
                    return Ok(Interaction::Proceed);
                }
            }
        }

        let Some(consent) = submission else {
            return Ok(Interaction::Consent(None));
        };

        if !consent.granted {
            return Ok(Interaction::Error(AuthError::client(
                ProtocolError::AccessDenied,
                "the user denied the request",
            )));
        }

        let valid_selection = !consent.scopes.is_empty()
            && consent
                .scopes
                .iter()
                .all(|s| request.requested_scopes.contains(s));
        if !valid_selection {
            return Ok(Interaction::Consent(Some(MSG_MUST_CHOOSE_PERMISSION)));
        }

        if consent.remember_consent && client.allow_remember_consent {
            self.consents
                .save(Consent {
                    subject,
                    client_id: client.client_id.clone(),
                    scopes: consent.scopes.clone(),
                    updated_at: Utc::now(),
                })
                .await?;
        }

        request.granted_scopes = consent.scopes.clone();
        Ok(Interaction::Proceed)
    }
}
