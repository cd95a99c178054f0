//! The authorize state machine.
//!
//! Phases run strictly in order: protocol validation, login check,
//! client validation, client-specific login check, consent check,
//! response generation. Any non-proceed result short-circuits into one
//! of four outcomes: a login redirect, the consent view, an error page,
//! or a protocol error redirect to the client. Exactly one endpoint
//! event is raised per terminus.

use crate::error::EndpointError;
use crate::models::{
    AuthorizeResponse, ConsentForm, ResponseMode, ResponseType, UserConsent, ValidatedRequest,
};
use crate::services::{Interaction, InteractionGenerator, RequestValidator, ResponseGenerator};
use signet_auth::{
    cookies, AntiForgery, ConsentViewModel, ErrorViewModel, HandlerOutcome, MessageCookies,
    RequestContext, SessionCookie, SignInMessage, ViewService,
};
use signet_core::{
    AuthError, AuthEvent, Endpoint, ErrorType, EventService, LocalizationService, ServerOptions,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Upper bound on an echoable `state` value when validation failed
/// before a request object existed.
const MAX_ECHOED_STATE: usize = 512;

/// Drives an authorize request through the state machine and translates
/// phase results into handler outcomes.
#[derive(Clone)]
pub struct AuthorizeController {
    options: Arc<ServerOptions>,
    validator: RequestValidator,
    interaction: InteractionGenerator,
    responses: ResponseGenerator,
    views: Arc<dyn ViewService>,
    localization: Arc<dyn LocalizationService>,
    events: EventService,
    messages: MessageCookies,
    session: SessionCookie,
    anti_forgery: AntiForgery,
}

impl AuthorizeController {
    /// Wire the controller from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: Arc<ServerOptions>,
        validator: RequestValidator,
        interaction: InteractionGenerator,
        responses: ResponseGenerator,
        views: Arc<dyn ViewService>,
        localization: Arc<dyn LocalizationService>,
        events: EventService,
        messages: MessageCookies,
        session: SessionCookie,
        anti_forgery: AntiForgery,
    ) -> Self {
        Self {
            options,
            validator,
            interaction,
            responses,
            views,
            localization,
            events,
            messages,
            session,
            anti_forgery,
        }
    }

    fn origin(&self) -> &str {
        self.options.public_origin.trim_end_matches('/')
    }

    /// `GET /connect/authorize` and the re-entry path used by consent.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        params: BTreeMap<String, String>,
        consent: Option<UserConsent>,
    ) -> Result<HandlerOutcome, EndpointError> {
        if !self.options.endpoints.enable_authorize_endpoint {
            return Ok(HandlerOutcome::status(404, "not found"));
        }

        let mut request = match self.validator.validate_protocol(&params) {
            Ok(request) => request,
            Err(error) => return self.finish_error(None, &params, error).await,
        };

        match self
            .interaction
            .process_login(&mut request, ctx.principal.as_ref())
        {
            Interaction::Login(message) => return self.login_redirect(message),
            Interaction::Error(error) => {
                return self.finish_error(Some(&request), &params, error).await
            }
            _ => {}
        }
        let Some(user) = ctx.principal.clone() else {
            let error = AuthError::server("login check passed without a principal");
            return self.finish_error(Some(&request), &params, error).await;
        };

        if let Err(error) = self.validator.validate_client(&mut request).await {
            return self.finish_error(Some(&request), &params, error).await;
        }

        match self.interaction.process_client_login(&request, &user) {
            Interaction::Login(message) => return self.login_redirect(message),
            Interaction::Error(error) => {
                return self.finish_error(Some(&request), &params, error).await
            }
            _ => {}
        }

        match self
            .interaction
            .process_consent(&mut request, &user, consent.as_ref())
            .await
        {
            Err(store_error) => {
                tracing::error!(error = %store_error, "consent store failure");
                let error = AuthError {
                    error_type: ErrorType::User,
                    error: signet_core::ProtocolError::ServerError,
                    description: Some("consent could not be evaluated".to_string()),
                };
                return self.finish_error(Some(&request), &params, error).await;
            }
            Ok(Interaction::Consent(message_key)) => {
                return self.consent_view(ctx, &request, message_key).await
            }
            Ok(Interaction::Error(error)) => {
                return self.finish_error(Some(&request), &params, error).await
            }
            Ok(_) => {}
        }

        request.subject = Some(user);
        let response = match self.responses.create_response(&request).await {
            Ok(response) => response,
            Err(error) => return self.finish_error(Some(&request), &params, error).await,
        };

        self.events.raise(AuthEvent::EndpointSuccess {
            endpoint: Endpoint::Authorize,
            client_id: Some(request.client_id.clone()),
            subject: request
                .subject
                .as_ref()
                .and_then(|s| s.subject())
                .map(str::to_string),
        });
        Ok(Self::emit(response))
    }

    /// `POST /connect/consent`: anti-forgery first, then re-enter the
    /// state machine with the submission.
    pub async fn consent(
        &self,
        ctx: &RequestContext,
        params: BTreeMap<String, String>,
        form: ConsentForm,
    ) -> Result<HandlerOutcome, EndpointError> {
        let Some(session_id) = self.session.read(&ctx.cookies) else {
            return Ok(HandlerOutcome::status(400, "invalid anti-forgery token"));
        };
        let token = form.anti_forgery_token.as_deref().unwrap_or_default();
        let signature = form.anti_forgery_sig.as_deref().unwrap_or_default();
        if !self.anti_forgery.validate(&session_id, token, signature) {
            tracing::warn!(
                target: "security",
                event_type = "anti_forgery_failed",
                "anti-forgery validation failed on consent form"
            );
            return Ok(HandlerOutcome::status(400, "invalid anti-forgery token"));
        }

        let consent = UserConsent::from(&form);
        self.authorize(ctx, params, Some(consent)).await
    }

    /// `GET /connect/switch`: force a fresh login for the same request.
    pub async fn switch_user(
        &self,
        ctx: &RequestContext,
        mut params: BTreeMap<String, String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        params.insert("prompt".to_string(), "login".to_string());
        self.authorize(ctx, params, None).await
    }

    /// Deliver a final authorize response via its response mode.
    fn emit(response: AuthorizeResponse) -> HandlerOutcome {
        match response.response_mode {
            ResponseMode::FormPost => HandlerOutcome::form_post(response.form_post_html()),
            _ => HandlerOutcome::redirect(response.redirect_url()),
        }
    }

    /// Mint a sign-in message cookie and redirect to the login page.
    fn login_redirect(&self, message: SignInMessage) -> Result<HandlerOutcome, EndpointError> {
        let id = cookies::random_id();
        let cookie = self.messages.write_signin(&id, &message)?;
        let url = format!("{}/login?signin={id}", self.origin());
        Ok(HandlerOutcome::redirect(url).with_cookie(cookie))
    }

    /// Render the consent view for the current request.
    async fn consent_view(
        &self,
        ctx: &RequestContext,
        request: &ValidatedRequest,
        message_key: Option<&str>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let Some(client) = &request.client else {
            let error = AuthError::server("consent view without a bound client");
            return self.finish_error(Some(request), &request.raw, error).await;
        };

        let (session_id, session_cookie) = self.session.ensure(&ctx.cookies);
        let model = ConsentViewModel {
            site_name: self.options.site_name.clone(),
            client_name: client.client_name.clone(),
            anti_forgery: self.anti_forgery.generate(&session_id),
            identity_scopes: request.identity_scopes.clone(),
            resource_scopes: request.resource_scopes.clone(),
            allow_remember_consent: client.allow_remember_consent,
            error_message: message_key.map(|key| self.localization.get_message(key)),
            post_url: format!("{}/connect/consent?{}", self.origin(), request.query_string()),
        };
        let html = self.views.consent(&model).await?;
        Ok(HandlerOutcome::html(html).with_cookies(session_cookie))
    }

    /// Terminate with an error: raise the failure event once, then either
    /// redirect to the client (client errors with a usable redirect
    /// target) or render the error page.
    async fn finish_error(
        &self,
        request: Option<&ValidatedRequest>,
        params: &BTreeMap<String, String>,
        error: AuthError,
    ) -> Result<HandlerOutcome, EndpointError> {
        self.events.raise(AuthEvent::EndpointFailure {
            endpoint: Endpoint::Authorize,
            reason: error.error.to_string(),
        });
        tracing::warn!(error = %error, "authorize request rejected");

        if error.error_type == ErrorType::Client {
            let (redirect_uri, response_mode, state) = match request {
                Some(request) => (
                    request.redirect_uri.clone(),
                    request.response_mode,
                    request.state.clone(),
                ),
                // Protocol validation failed before a request existed;
                // the redirect URI syntax has already been checked at
                // this point, so fall back to the raw parameters.
                None => (
                    params.get("redirect_uri").cloned().unwrap_or_default(),
                    params
                        .get("response_mode")
                        .and_then(|m| ResponseMode::parse(m))
                        .or_else(|| {
                            params
                                .get("response_type")
                                .and_then(|t| ResponseType::parse(t))
                                .map(|t| t.default_response_mode())
                        })
                        .unwrap_or(ResponseMode::Query),
                    params
                        .get("state")
                        .filter(|s| s.len() <= MAX_ECHOED_STATE)
                        .cloned(),
                ),
            };
            if !redirect_uri.is_empty() {
                let response =
                    AuthorizeResponse::error(redirect_uri, response_mode, error.error, state);
                return Ok(Self::emit(response));
            }
        }

        self.render_error(&error).await
    }

    /// Render the error page with a localized, non-leaking message.
    async fn render_error(&self, error: &AuthError) -> Result<HandlerOutcome, EndpointError> {
        let model = ErrorViewModel {
            site_name: self.options.site_name.clone(),
            error_message: self.localization.get_message(&error.error.to_string()),
        };
        let html = self.views.error(&model).await?;
        Ok(HandlerOutcome::html(html))
    }
}
