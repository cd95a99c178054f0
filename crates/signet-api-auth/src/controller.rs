//! The interactive authentication flow controller.
//!
//! Owns login (local and external), the external challenge/callback
//! round trip, partial sign-in resumption, and logout. Every path ends
//! in a redirect, a rendered view, or a bare status; cookie mutations
//! ride on the outcome.

use crate::error::EndpointError;
use crate::models::{ChallengeProperties, ExternalProvider, LoginForm, LogoutForm};
use signet_auth::{
    claim_types, cookies,
    cookies::CHALLENGE_COOKIE,
    schemes, AntiForgery, AuthCookieIssuer, AuthenticateResult, Claim, ClaimsIdentity,
    ErrorViewModel, ExternalIdentity, ExternalProviderLink, HandlerOutcome, LastUsernameCookie,
    LoggedOutViewModel, LoginViewModel, LogoutViewModel, MessageCookies, MessageProtector,
    RequestContext, SessionCookie, SignInMessage, SignOutMessage, UserService, ViewService,
};
use signet_core::{
    AuthEvent, Client, ClientStore, EventService, LocalizationService, ServerOptions,
};
use std::sync::Arc;

/// Message key for failed or missing local credentials.
pub const MSG_INVALID_CREDENTIALS: &str = "invalid_username_or_password";
/// Message key when the sign-in message cookie is missing or expired.
pub const MSG_SIGNIN_NOT_FOUND: &str = "sign_in_flow_not_found";
/// Message key when an external login cannot be completed.
pub const MSG_EXTERNAL_FAILED: &str = "external_login_failed";
/// Message key when the requested provider is not allowed for the client.
pub const MSG_PROVIDER_NOT_ALLOWED: &str = "external_provider_not_allowed";
/// Message key when the requested provider is not configured.
pub const MSG_UNKNOWN_PROVIDER: &str = "unknown_external_provider";
/// Message key when no partial sign-in is present.
pub const MSG_NO_PARTIAL_SIGNIN: &str = "no_partial_sign_in";
/// Message key when the partial identity carries no matching resume claim.
pub const MSG_MISSING_RESUME_CLAIM: &str = "missing_resume_claim";
/// Message key for collaborator failures.
pub const MSG_SERVER_ERROR: &str = "server_error";

/// Interactive login/logout controller.
#[derive(Clone)]
pub struct AuthenticationController {
    options: Arc<ServerOptions>,
    users: Arc<dyn UserService>,
    clients: Arc<dyn ClientStore>,
    views: Arc<dyn ViewService>,
    localization: Arc<dyn LocalizationService>,
    events: EventService,
    providers: Vec<ExternalProvider>,
    protector: Arc<MessageProtector>,
    messages: MessageCookies,
    issuer: AuthCookieIssuer,
    session: SessionCookie,
    last_username: LastUsernameCookie,
    anti_forgery: AntiForgery,
}

impl AuthenticationController {
    /// Wire the controller from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: Arc<ServerOptions>,
        users: Arc<dyn UserService>,
        clients: Arc<dyn ClientStore>,
        views: Arc<dyn ViewService>,
        localization: Arc<dyn LocalizationService>,
        events: EventService,
        providers: Vec<ExternalProvider>,
        protector: Arc<MessageProtector>,
        messages: MessageCookies,
        issuer: AuthCookieIssuer,
        session: SessionCookie,
        last_username: LastUsernameCookie,
        anti_forgery: AntiForgery,
    ) -> Self {
        Self {
            options,
            users,
            clients,
            views,
            localization,
            events,
            providers,
            protector,
            messages,
            issuer,
            session,
            last_username,
            anti_forgery,
        }
    }

    fn origin(&self) -> &str {
        self.options.public_origin.trim_end_matches('/')
    }

    fn secure(&self) -> bool {
        self.options.authentication.cookie.secure
    }

    /// `GET /login?signin=<id>`.
    pub async fn login_get(
        &self,
        ctx: &RequestContext,
        signin: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let Some((id, message)) = self.read_signin(ctx, signin.as_deref()) else {
            return self.render_error(MSG_SIGNIN_NOT_FOUND).await;
        };

        // Silent SSO hook: a non-error result skips the page entirely.
        match self.users.pre_authenticate(&message).await {
            Err(err) => {
                tracing::error!(error = %err, "pre-authentication failed");
                return self.render_error(MSG_SERVER_ERROR).await;
            }
            Ok(Some(AuthenticateResult::Error(key))) => {
                let error = self.localization.get_message(&key);
                return self.render_login(ctx, &id, &message, Some(error), None).await;
            }
            Ok(Some(result)) => {
                return self.sign_in_and_redirect(&id, &message, result, None, None);
            }
            Ok(None) => {}
        }

        if let Some(idp) = &message.idp {
            let url = format!(
                "{}/external?signin={}&provider={}",
                self.origin(),
                urlencoding::encode(&id),
                urlencoding::encode(idp)
            );
            return Ok(HandlerOutcome::redirect(url));
        }

        self.render_login(ctx, &id, &message, None, None).await
    }

    /// `POST /login?signin=<id>`.
    pub async fn login_post(
        &self,
        ctx: &RequestContext,
        signin: Option<String>,
        form: LoginForm,
    ) -> Result<HandlerOutcome, EndpointError> {
        if !self.options.authentication.enable_local_login {
            return Ok(HandlerOutcome::status(405, "local login is disabled"));
        }
        let Some((id, message)) = self.read_signin(ctx, signin.as_deref()) else {
            return self.render_error(MSG_SIGNIN_NOT_FOUND).await;
        };
        if let Some(outcome) = self.check_anti_forgery(
            ctx,
            form.anti_forgery_token.as_deref(),
            form.anti_forgery_sig.as_deref(),
        ) {
            return Ok(outcome);
        }

        let username = form.username.trim();
        if username.is_empty() || form.password.is_empty() {
            let error = self.localization.get_message(MSG_INVALID_CREDENTIALS);
            return self
                .render_login(ctx, &id, &message, Some(error), Some(username.to_string()))
                .await;
        }

        match self
            .users
            .authenticate_local(username, &form.password, &message)
            .await
        {
            Err(err) => {
                tracing::error!(error = %err, "local authentication failed");
                self.render_error(MSG_SERVER_ERROR).await
            }
            Ok(None) => {
                self.events.raise(AuthEvent::LocalLoginFailure {
                    username: username.to_string(),
                    reason: "invalid credentials".to_string(),
                });
                let error = self.localization.get_message(MSG_INVALID_CREDENTIALS);
                self.render_login(ctx, &id, &message, Some(error), Some(username.to_string()))
                    .await
            }
            Ok(Some(AuthenticateResult::Error(key))) => {
                self.events.raise(AuthEvent::LocalLoginFailure {
                    username: username.to_string(),
                    reason: key.clone(),
                });
                let error = self.localization.get_message(&key);
                self.render_login(ctx, &id, &message, Some(error), Some(username.to_string()))
                    .await
            }
            Ok(Some(result)) => {
                if let AuthenticateResult::FullSignIn(identity) = &result {
                    self.events.raise(AuthEvent::LocalLoginSuccess {
                        username: username.to_string(),
                        subject: identity.subject().unwrap_or_default().to_string(),
                        signin_id: id.clone(),
                    });
                }
                self.sign_in_and_redirect(
                    &id,
                    &message,
                    result,
                    form.remember_me_choice(),
                    Some(username),
                )
            }
        }
    }

    /// `GET /external?signin=<id>&provider=<p>`: challenge the provider.
    pub async fn external_challenge(
        &self,
        ctx: &RequestContext,
        signin: Option<String>,
        provider: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let Some((id, message)) = self.read_signin(ctx, signin.as_deref()) else {
            return self.render_error(MSG_SIGNIN_NOT_FOUND).await;
        };
        let Some(provider) = provider.filter(|p| !p.is_empty()) else {
            return self.render_error(MSG_UNKNOWN_PROVIDER).await;
        };
        let Some(configured) = self.providers.iter().find(|p| p.name == provider) else {
            return self.render_error(MSG_UNKNOWN_PROVIDER).await;
        };

        if let Some(client_id) = &message.client_id {
            match self
                .clients
                .is_valid_identity_provider(client_id, &provider)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        target: "security",
                        client_id = %client_id,
                        provider = %provider,
                        "external provider not allowed for client"
                    );
                    return self.render_error(MSG_PROVIDER_NOT_ALLOWED).await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "client store lookup failed");
                    return self.render_error(MSG_SERVER_ERROR).await;
                }
            }
        }

        // The sign-in id rides in a sealed properties cookie so it
        // survives the round trip through the provider.
        let nonce = cookies::random_id();
        let properties = ChallengeProperties::new(&id, &provider, &nonce);
        let blob = self.protector.seal(CHALLENGE_COOKIE, &properties)?;
        let cookie = cookies::set_cookie(
            CHALLENGE_COOKIE,
            &blob,
            Some(self.options.authentication.sign_in_message_max_age_secs),
            self.secure(),
        );

        let separator = if configured.authorize_endpoint.contains('?') {
            '&'
        } else {
            '?'
        };
        let url = format!(
            "{}{separator}redirect_uri={}&state={}",
            configured.authorize_endpoint,
            urlencoding::encode(&format!("{}/callback", self.origin())),
            urlencoding::encode(&nonce),
        );
        Ok(HandlerOutcome::redirect(url).with_cookie(cookie))
    }

    /// `GET /callback`: process the provider's response.
    pub async fn external_callback(
        &self,
        ctx: &RequestContext,
        state: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let clear_challenge = cookies::clear_cookie(CHALLENGE_COOKIE, self.secure());

        let properties: Option<ChallengeProperties> = ctx
            .cookies
            .get(CHALLENGE_COOKIE)
            .and_then(|blob| self.protector.open(CHALLENGE_COOKIE, blob));
        let Some(properties) = properties.filter(|p| {
            !p.is_expired(self.options.authentication.sign_in_message_max_age_secs)
        }) else {
            return self.render_error(MSG_EXTERNAL_FAILED).await;
        };
        if state.as_deref() != Some(properties.nonce.as_str()) {
            tracing::warn!(
                target: "security",
                provider = %properties.provider,
                "external callback state mismatch"
            );
            return self.render_error(MSG_EXTERNAL_FAILED).await;
        }

        let Some(message) = self.messages.read_signin(&ctx.cookies, &properties.signin_id) else {
            return self.render_error(MSG_SIGNIN_NOT_FOUND).await;
        };

        // The external middleware materializes the provider identity as
        // a temporary external-scheme cookie before this route runs.
        let Some(external) = self.issuer.read(&ctx.cookies, schemes::EXTERNAL) else {
            return self.render_error(MSG_EXTERNAL_FAILED).await;
        };
        let Some(provider_id) = external.subject().map(str::to_string) else {
            return self.render_error(MSG_EXTERNAL_FAILED).await;
        };

        let identity = ExternalIdentity {
            provider: properties.provider.clone(),
            provider_id,
            claims: external
                .claims
                .iter()
                .map(|c| (c.claim_type.clone(), c.value.clone()))
                .collect(),
        };

        let outcome = self
            .finish_external_login(ctx, &properties.signin_id, &message, &identity)
            .await?;
        Ok(outcome.with_cookie(clear_challenge))
    }

    /// `GET /resume?resume=<id>`: continue a partial sign-in.
    pub async fn resume(
        &self,
        ctx: &RequestContext,
        resume: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let Some(partial) = self.issuer.read(&ctx.cookies, schemes::PARTIAL) else {
            return self.render_error(MSG_NO_PARTIAL_SIGNIN).await;
        };
        let Some(resume_id) = resume.filter(|r| !r.is_empty()) else {
            return self.render_error(MSG_MISSING_RESUME_CLAIM).await;
        };
        let Some(signin_id) = partial.resume_claim(&resume_id).map(|c| c.value.clone()) else {
            return self.render_error(MSG_MISSING_RESUME_CLAIM).await;
        };
        let Some(message) = self.messages.read_signin(&ctx.cookies, &signin_id) else {
            return self.render_error(MSG_SIGNIN_NOT_FOUND).await;
        };

        if !partial.is_unmapped_external() {
            // The user service already established a subject; strip the
            // partial-login claims and promote to a full session.
            let mut identity = partial;
            identity.remove(claim_types::PARTIAL_LOGIN_RETURN_URL);
            identity
                .claims
                .retain(|c| !c.claim_type.starts_with(claim_types::PARTIAL_LOGIN_RESUME_ID_PREFIX));
            return self.sign_in_full(&signin_id, &message, identity, None, None);
        }

        // A not-yet-mapped external user: rebuild the external identity
        // from the partial claims and run external authentication again.
        let Some(provider) = partial.identity_provider().map(str::to_string) else {
            return self.render_error(MSG_EXTERNAL_FAILED).await;
        };
        let Some(provider_id) = partial
            .value_of(claim_types::EXTERNAL_PROVIDER_USER_ID)
            .map(str::to_string)
        else {
            return self.render_error(MSG_EXTERNAL_FAILED).await;
        };
        let identity = ExternalIdentity {
            provider,
            provider_id,
            claims: partial
                .claims
                .iter()
                .filter(|c| {
                    c.claim_type != claim_types::PARTIAL_LOGIN_RETURN_URL
                        && !c
                            .claim_type
                            .starts_with(claim_types::PARTIAL_LOGIN_RESUME_ID_PREFIX)
                })
                .map(|c| (c.claim_type.clone(), c.value.clone()))
                .collect(),
        };
        self.finish_external_login(ctx, &signin_id, &message, &identity)
            .await
    }

    /// `GET /logout?id=<id?>`: prompt, unless the rules say skip it.
    pub async fn logout_get(
        &self,
        ctx: &RequestContext,
        id: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let signout = id
            .as_deref()
            .and_then(|i| self.messages.read_signout(&ctx.cookies, i));

        let skip_prompt = !ctx.is_authenticated()
            || signout.as_ref().is_some_and(|m| m.client_id.is_some())
            || !self.options.authentication.enable_sign_out_prompt;
        if skip_prompt {
            return self.execute_logout(ctx, id).await;
        }

        let client_name = match &signout {
            Some(message) => self.signout_client(message).await.map(|c| c.client_name),
            None => None,
        };
        let (session_id, session_cookie) = self.session.ensure(&ctx.cookies);
        let post_url = match &id {
            Some(id) => format!("{}/logout?id={}", self.origin(), urlencoding::encode(id)),
            None => format!("{}/logout", self.origin()),
        };
        let model = LogoutViewModel {
            site_name: self.options.site_name.clone(),
            client_name,
            anti_forgery: self.anti_forgery.generate(&session_id),
            post_url,
        };
        let html = self.views.logout(&model).await?;
        Ok(HandlerOutcome::html(html).with_cookies(session_cookie))
    }

    /// `POST /logout?id=<id?>`: clear every session artifact and render
    /// the logged-out view with the front-channel signout frames.
    pub async fn logout_post(
        &self,
        ctx: &RequestContext,
        id: Option<String>,
        form: LogoutForm,
    ) -> Result<HandlerOutcome, EndpointError> {
        if let Some(outcome) = self.check_anti_forgery(
            ctx,
            form.anti_forgery_token.as_deref(),
            form.anti_forgery_sig.as_deref(),
        ) {
            return Ok(outcome);
        }
        self.execute_logout(ctx, id).await
    }

    /// Shared sign-in continuation for full and partial results.
    fn sign_in_and_redirect(
        &self,
        signin_id: &str,
        message: &SignInMessage,
        result: AuthenticateResult,
        remember_me: Option<bool>,
        username: Option<&str>,
    ) -> Result<HandlerOutcome, EndpointError> {
        match result {
            AuthenticateResult::FullSignIn(identity) => {
                self.sign_in_full(signin_id, message, identity, remember_me, username)
            }
            AuthenticateResult::PartialSignIn {
                identity,
                redirect_path,
            } => self.sign_in_partial(signin_id, identity, &redirect_path),
            AuthenticateResult::Error(_) => {
                // Callers translate error results before reaching here.
                Ok(HandlerOutcome::status(500, "server_error"))
            }
        }
    }

    /// Issue the primary cookie and return to the authorize flow.
    fn sign_in_full(
        &self,
        signin_id: &str,
        message: &SignInMessage,
        mut identity: ClaimsIdentity,
        remember_me: Option<bool>,
        username: Option<&str>,
    ) -> Result<HandlerOutcome, EndpointError> {
        identity.scheme = schemes::PRIMARY.to_string();
        if identity.auth_time().is_none() {
            identity.add(Claim::new(
                claim_types::AUTH_TIME,
                chrono::Utc::now().timestamp().to_string(),
            ));
        }
        if identity.identity_provider().is_none() {
            identity.add(Claim::new(
                claim_types::IDENTITY_PROVIDER,
                signet_auth::LOCAL_IDENTITY_PROVIDER,
            ));
        }

        let mut out = self.issuer.issue(&identity, remember_me)?;
        out.push(self.messages.clear_signin(signin_id));
        if let Some(name) = username {
            if let Some(cookie) = self.last_username.write(Some(name)) {
                out.push(cookie);
            }
        }
        Ok(HandlerOutcome::redirect(message.return_url.clone()).with_cookies(out))
    }

    /// Issue the partial cookie and send the user to the data-collection
    /// path. The sign-in message cookie is preserved; its id is needed to
    /// resume.
    fn sign_in_partial(
        &self,
        signin_id: &str,
        mut identity: ClaimsIdentity,
        redirect_path: &str,
    ) -> Result<HandlerOutcome, EndpointError> {
        let Some(target) = self.resolve_relative(redirect_path) else {
            tracing::warn!(
                target: "security",
                path = %redirect_path,
                "partial sign-in redirect path rejected"
            );
            return Ok(HandlerOutcome::status(500, "server_error"));
        };

        let resume_id = cookies::random_id();
        identity.scheme = schemes::PARTIAL.to_string();
        identity.add(Claim::new(
            claim_types::PARTIAL_LOGIN_RETURN_URL,
            format!("{}/resume?resume={resume_id}", self.origin()),
        ));
        identity.add(Claim::new(
            format!("{}{resume_id}", claim_types::PARTIAL_LOGIN_RESUME_ID_PREFIX),
            signin_id,
        ));

        let out = self.issuer.issue(&identity, None)?;
        self.events.raise(AuthEvent::PartialLogin {
            subject: identity.subject().map(str::to_string),
            resume_path: redirect_path.to_string(),
        });
        Ok(HandlerOutcome::redirect(target).with_cookies(out))
    }

    /// Run external authentication and continue per its result.
    async fn finish_external_login(
        &self,
        ctx: &RequestContext,
        signin_id: &str,
        message: &SignInMessage,
        identity: &ExternalIdentity,
    ) -> Result<HandlerOutcome, EndpointError> {
        match self.users.authenticate_external(identity, message).await {
            Err(err) => {
                tracing::error!(error = %err, provider = %identity.provider, "external authentication failed");
                self.render_error(MSG_SERVER_ERROR).await
            }
            Ok(None) => {
                self.events.raise(AuthEvent::ExternalLoginFailure {
                    provider: identity.provider.clone(),
                    reason: "no account".to_string(),
                });
                self.render_error(MSG_EXTERNAL_FAILED).await
            }
            Ok(Some(AuthenticateResult::Error(key))) => {
                self.events.raise(AuthEvent::ExternalLoginFailure {
                    provider: identity.provider.clone(),
                    reason: key.clone(),
                });
                let error = self.localization.get_message(&key);
                self.render_login(ctx, signin_id, message, Some(error), None)
                    .await
            }
            Ok(Some(result)) => {
                if let AuthenticateResult::FullSignIn(full) = &result {
                    self.events.raise(AuthEvent::ExternalLoginSuccess {
                        provider: identity.provider.clone(),
                        subject: full.subject().unwrap_or_default().to_string(),
                    });
                }
                self.sign_in_and_redirect(signin_id, message, result, None, None)
            }
        }
    }

    /// Clear every session artifact and render the logged-out view.
    async fn execute_logout(
        &self,
        ctx: &RequestContext,
        id: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let signout = id
            .as_deref()
            .and_then(|i| self.messages.read_signout(&ctx.cookies, i));

        let mut cleared = self.issuer.clear_all();
        cleared.push(self.session.clear());
        cleared.extend(self.messages.clear_all(&ctx.cookies));

        if let Some(principal) = &ctx.principal {
            if let Err(err) = self.users.sign_out(principal).await {
                tracing::error!(error = %err, "user sign-out notification failed");
            }
        }
        self.events.raise(AuthEvent::Logout {
            subject: ctx
                .principal
                .as_ref()
                .and_then(|p| p.subject())
                .map(str::to_string),
        });

        let (redirect_url, client_name) = match &signout {
            Some(message) => self.post_logout_redirect(message).await,
            None => (None, None),
        };

        let model = LoggedOutViewModel {
            site_name: self.options.site_name.clone(),
            iframe_urls: self.options.protocol_logout_urls.clone(),
            redirect_url,
            client_name,
        };
        let html = self.views.logged_out(&model).await?;
        Ok(HandlerOutcome::html(html).with_cookies(cleared))
    }

    /// Resolve the client named by a sign-out message.
    async fn signout_client(&self, message: &SignOutMessage) -> Option<Client> {
        let client_id = message.client_id.as_deref()?;
        match self.clients.find_enabled(client_id).await {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, client_id = %client_id, "client store lookup failed");
                None
            }
        }
    }

    /// Validate the requested post-logout redirect against the client's
    /// registration; echo the message state when the redirect is used.
    async fn post_logout_redirect(
        &self,
        message: &SignOutMessage,
    ) -> (Option<String>, Option<String>) {
        let Some(client) = self.signout_client(message).await else {
            return (None, None);
        };
        let client_name = Some(client.client_name.clone());

        let redirect = message.post_logout_redirect_uri.as_deref().and_then(|uri| {
            if !client.post_logout_redirect_uris.iter().any(|u| u == uri) {
                tracing::warn!(
                    target: "security",
                    client_id = %client.client_id,
                    uri = %uri,
                    "post_logout_redirect_uri not registered"
                );
                return None;
            }
            Some(match &message.state {
                Some(state) => {
                    let separator = if uri.contains('?') { '&' } else { '?' };
                    format!("{uri}{separator}state={}", urlencoding::encode(state))
                }
                None => uri.to_string(),
            })
        });
        (redirect, client_name)
    }

    /// Render the login page for the flow described by `message`.
    async fn render_login(
        &self,
        ctx: &RequestContext,
        signin_id: &str,
        message: &SignInMessage,
        error_message: Option<String>,
        username: Option<String>,
    ) -> Result<HandlerOutcome, EndpointError> {
        let client = match &message.client_id {
            Some(client_id) => match self.clients.find_enabled(client_id).await {
                Ok(client) => client,
                Err(err) => {
                    tracing::error!(error = %err, "client store lookup failed");
                    return self.render_error(MSG_SERVER_ERROR).await;
                }
            },
            None => None,
        };

        let show_login_form = self.options.authentication.enable_local_login
            && client.as_ref().is_none_or(|c| c.enable_local_login);
        let external_providers: Vec<ExternalProviderLink> = self
            .providers
            .iter()
            .filter(|p| {
                client
                    .as_ref()
                    .is_none_or(|c| c.allows_identity_provider(&p.name))
            })
            .map(|p| ExternalProviderLink {
                provider: p.name.clone(),
                display_name: p.display_name.clone(),
                href: format!(
                    "{}/external?signin={}&provider={}",
                    self.origin(),
                    urlencoding::encode(signin_id),
                    urlencoding::encode(&p.name)
                ),
            })
            .collect();

        let username = username
            .or_else(|| message.login_hint.clone())
            .or_else(|| self.last_username.read(&ctx.cookies));

        let (session_id, session_cookie) = self.session.ensure(&ctx.cookies);
        let model = LoginViewModel {
            site_name: self.options.site_name.clone(),
            signin_id: signin_id.to_string(),
            anti_forgery: self.anti_forgery.generate(&session_id),
            show_login_form,
            allow_remember_me: self.options.authentication.cookie.allow_remember_me,
            username,
            error_message,
            external_providers,
            links: self.options.authentication.login_page_links.clone(),
        };
        let html = self.views.login(&model).await?;
        Ok(HandlerOutcome::html(html).with_cookies(session_cookie))
    }

    /// Render the error page with a localized message.
    async fn render_error(&self, message_key: &str) -> Result<HandlerOutcome, EndpointError> {
        let model = ErrorViewModel {
            site_name: self.options.site_name.clone(),
            error_message: self.localization.get_message(message_key),
        };
        let html = self.views.error(&model).await?;
        Ok(HandlerOutcome::html(html))
    }

    /// Resolve the sign-in id and message, treating absent or expired
    /// messages uniformly.
    fn read_signin(
        &self,
        ctx: &RequestContext,
        signin: Option<&str>,
    ) -> Option<(String, SignInMessage)> {
        let id = signin.filter(|s| !s.is_empty())?;
        let message = self.messages.read_signin(&ctx.cookies, id)?;
        Some((id.to_string(), message))
    }

    /// Anti-forgery gate for POSTs; returns the 400 outcome on failure.
    fn check_anti_forgery(
        &self,
        ctx: &RequestContext,
        token: Option<&str>,
        signature: Option<&str>,
    ) -> Option<HandlerOutcome> {
        let session_id = self.session.read(&ctx.cookies);
        let valid = session_id.as_deref().is_some_and(|sid| {
            self.anti_forgery
                .validate(sid, token.unwrap_or_default(), signature.unwrap_or_default())
        });
        if valid {
            None
        } else {
            tracing::warn!(
                target: "security",
                event_type = "anti_forgery_failed",
                "anti-forgery validation failed"
            );
            Some(HandlerOutcome::status(400, "invalid anti-forgery token"))
        }
    }

    /// Map a relative application path (`~/register` or `/register`) to
    /// an absolute URL under the public origin. Anything else is
    /// rejected.
    fn resolve_relative(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        let rooted = trimmed.strip_prefix('~').unwrap_or(trimmed);
        if !rooted.starts_with('/') {
            return None;
        }
        if rooted.starts_with("//") || rooted.starts_with("/\\") || rooted.contains("://") {
            return None;
        }
        Some(format!("{}{rooted}", self.origin()))
    }
}
