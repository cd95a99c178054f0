//! Integration tests for local login, silent SSO, and the external
//! provider round trip.

mod common;

use common::{
    apply_cookies, full_identity, test_options, TestHarness, GOOD_PASSWORD,
};
use signet_api_auth::LoginForm;
use signet_auth::{
    claim_types, schemes, AuthenticateResult, Claim, ClaimsIdentity, HandlerAction,
    RequestContext,
};
use std::collections::BTreeMap;

fn ctx(jar: BTreeMap<String, String>) -> RequestContext {
    RequestContext {
        cookies: jar,
        principal: None,
    }
}

fn login_form(username: &str, password: &str, token: (String, String)) -> LoginForm {
    LoginForm {
        username: username.into(),
        password: password.into(),
        remember_me: None,
        anti_forgery_token: Some(token.0),
        anti_forgery_sig: Some(token.1),
    }
}

#[tokio::test]
async fn login_without_signin_message_renders_error() {
    let harness = TestHarness::new(test_options());
    let outcome = harness
        .state
        .controller
        .login_get(&ctx(BTreeMap::new()), Some("missing".into()))
        .await
        .unwrap();
    match &outcome.action {
        HandlerAction::Html(body) => assert!(body.contains("sign_in_flow_not_found")),
        other => panic!("expected error view, got {other:?}"),
    }
}

#[tokio::test]
async fn login_page_renders_providers_and_hint() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    let mut message = harness.signin_message();
    message.login_hint = Some("alice@example.com".into());
    harness.seed_signin(&mut jar, "s1", &message);

    let outcome = harness
        .state
        .controller
        .login_get(&ctx(jar), Some("s1".into()))
        .await
        .unwrap();
    let HandlerAction::Html(body) = &outcome.action else {
        panic!("expected login view, got {:?}", outcome.action);
    };
    assert!(body.starts_with("login:"));
    assert!(body.contains("alice@example.com"));
    assert!(body.contains("Google"));
    assert!(body.contains("/external?signin=s1&provider=google"));
    // Rendering the form issues a browser session for anti-forgery.
    assert!(outcome.cookies.iter().any(|c| c.starts_with("signet.session=")));
}

#[tokio::test]
async fn signin_message_idp_redirects_to_external_challenge() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    let mut message = harness.signin_message();
    message.idp = Some("google".into());
    harness.seed_signin(&mut jar, "s1", &message);

    let outcome = harness
        .state
        .controller
        .login_get(&ctx(jar), Some("s1".into()))
        .await
        .unwrap();
    assert_eq!(
        outcome.action,
        HandlerAction::Redirect("https://id.test/external?signin=s1&provider=google".into())
    );
}

#[tokio::test]
async fn pre_authentication_short_circuits_to_redirect() {
    let harness = TestHarness::new(test_options());
    *harness.users.pre_result.lock().unwrap() =
        Some(AuthenticateResult::FullSignIn(full_identity()));

    let mut jar = BTreeMap::new();
    let message = harness.signin_message();
    harness.seed_signin(&mut jar, "s1", &message);

    let outcome = harness
        .state
        .controller
        .login_get(&ctx(jar), Some("s1".into()))
        .await
        .unwrap();
    let HandlerAction::Redirect(url) = &outcome.action else {
        panic!("expected redirect, got {:?}", outcome.action);
    };
    assert_eq!(url, &message.return_url);
    assert!(outcome.cookies.iter().any(|c| c.starts_with("signet.auth=")));
}

#[tokio::test]
async fn successful_local_login_signs_in_and_returns() {
    let harness = TestHarness::new(test_options());
    *harness.users.local_result.lock().unwrap() =
        Some(AuthenticateResult::FullSignIn(full_identity()));

    let mut jar = BTreeMap::new();
    let message = harness.signin_message();
    harness.seed_signin(&mut jar, "s1", &message);
    let token = harness.seed_session(&mut jar);

    let outcome = harness
        .state
        .controller
        .login_post(
            &ctx(jar.clone()),
            Some("s1".into()),
            login_form("alice", GOOD_PASSWORD, token),
        )
        .await
        .unwrap();

    let HandlerAction::Redirect(url) = &outcome.action else {
        panic!("expected redirect, got {:?}", outcome.action);
    };
    assert_eq!(url, &message.return_url);

    // The primary cookie is issued, the sign-in message cleared, and the
    // username remembered.
    assert!(outcome.cookies.iter().any(|c| c.starts_with("signet.auth=")));
    assert!(outcome
        .cookies
        .iter()
        .any(|c| c.starts_with("signet.signin.s1=") && c.contains("Max-Age=0")));
    assert!(outcome.cookies.iter().any(|c| c.starts_with("signet.username=")));

    // The issued session resolves as an authenticated principal.
    apply_cookies(&mut jar, &outcome.cookies);
    let principal = harness.state.cookie_issuer.read(&jar, schemes::PRIMARY).unwrap();
    assert_eq!(principal.subject(), Some("user-1"));
    assert!(principal.auth_time().is_some());

    assert_eq!(harness.events.tags(), vec!["local_login_success"]);
}

#[tokio::test]
async fn failed_local_login_rerenders_with_error() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());
    let token = harness.seed_session(&mut jar);

    let outcome = harness
        .state
        .controller
        .login_post(
            &ctx(jar),
            Some("s1".into()),
            login_form("alice", "wrong", token),
        )
        .await
        .unwrap();
    let HandlerAction::Html(body) = &outcome.action else {
        panic!("expected login view, got {:?}", outcome.action);
    };
    assert!(body.contains("invalid_username_or_password"));
    assert!(body.contains("alice"));
    assert_eq!(harness.events.tags(), vec!["local_login_failure"]);
}

#[tokio::test]
async fn login_post_without_anti_forgery_is_rejected() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());

    let form = LoginForm {
        username: "alice".into(),
        password: GOOD_PASSWORD.into(),
        remember_me: None,
        anti_forgery_token: Some("0:deadbeef".into()),
        anti_forgery_sig: Some("forged".into()),
    };
    let outcome = harness
        .state
        .controller
        .login_post(&ctx(jar), Some("s1".into()), form)
        .await
        .unwrap();
    assert!(matches!(outcome.action, HandlerAction::Status(400, _)));
}

#[tokio::test]
async fn disabled_local_login_returns_405() {
    let mut options = test_options();
    options.authentication.enable_local_login = false;
    let harness = TestHarness::new(options);
    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());
    let token = harness.seed_session(&mut jar);

    let outcome = harness
        .state
        .controller
        .login_post(
            &ctx(jar),
            Some("s1".into()),
            login_form("alice", GOOD_PASSWORD, token),
        )
        .await
        .unwrap();
    assert!(matches!(outcome.action, HandlerAction::Status(405, _)));
}

#[tokio::test]
async fn remember_me_issues_persistent_cookie() {
    let harness = TestHarness::new(test_options());
    *harness.users.local_result.lock().unwrap() =
        Some(AuthenticateResult::FullSignIn(full_identity()));

    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());
    let token = harness.seed_session(&mut jar);

    let mut form = login_form("alice", GOOD_PASSWORD, token);
    form.remember_me = Some("true".into());
    let outcome = harness
        .state
        .controller
        .login_post(&ctx(jar), Some("s1".into()), form)
        .await
        .unwrap();
    let auth = outcome
        .cookies
        .iter()
        .find(|c| c.starts_with("signet.auth="))
        .unwrap();
    assert!(auth.contains("Max-Age="));
}

#[tokio::test]
async fn external_challenge_redirects_to_provider() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());

    let outcome = harness
        .state
        .controller
        .external_challenge(&ctx(jar), Some("s1".into()), Some("google".into()))
        .await
        .unwrap();
    let HandlerAction::Redirect(url) = &outcome.action else {
        panic!("expected redirect, got {:?}", outcome.action);
    };
    assert!(url.starts_with("https://accounts.google.test/authorize?"));
    assert!(url.contains("redirect_uri=https%3A%2F%2Fid.test%2Fcallback"));
    assert!(url.contains("state="));
    assert!(outcome
        .cookies
        .iter()
        .any(|c| c.starts_with("signet.challenge=")));
}

#[tokio::test]
async fn external_challenge_rejects_unknown_provider() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());

    let outcome = harness
        .state
        .controller
        .external_challenge(&ctx(jar), Some("s1".into()), Some("facebook".into()))
        .await
        .unwrap();
    match &outcome.action {
        HandlerAction::Html(body) => assert!(body.contains("unknown_external_provider")),
        other => panic!("expected error view, got {other:?}"),
    }
}

#[tokio::test]
async fn external_callback_completes_sign_in() {
    let harness = TestHarness::new(test_options());
    harness
        .users
        .external_results
        .lock()
        .unwrap()
        .push_back(AuthenticateResult::FullSignIn(full_identity()));

    // Challenge first to obtain the round-trip cookie and state nonce.
    let mut jar = BTreeMap::new();
    let message = harness.signin_message();
    harness.seed_signin(&mut jar, "s1", &message);
    let challenge = harness
        .state
        .controller
        .external_challenge(&ctx(jar.clone()), Some("s1".into()), Some("google".into()))
        .await
        .unwrap();
    apply_cookies(&mut jar, &challenge.cookies);
    let HandlerAction::Redirect(challenge_url) = &challenge.action else {
        panic!("expected redirect");
    };
    let state_nonce = challenge_url
        .split("state=")
        .nth(1)
        .unwrap()
        .split('&')
        .next()
        .unwrap()
        .to_string();

    // The external middleware (out of scope here) would have signed in
    // the provider identity under the external scheme.
    let external = ClaimsIdentity::with_claims(
        schemes::EXTERNAL,
        vec![
            Claim::new(claim_types::SUBJECT, "google-123"),
            Claim::new("email", "alice@gmail.test"),
        ],
    );
    apply_cookies(
        &mut jar,
        &harness.state.cookie_issuer.issue(&external, None).unwrap(),
    );

    let outcome = harness
        .state
        .controller
        .external_callback(&ctx(jar), Some(state_nonce))
        .await
        .unwrap();
    let HandlerAction::Redirect(url) = &outcome.action else {
        panic!("expected redirect, got {:?}", outcome.action);
    };
    assert_eq!(url, &message.return_url);
    assert_eq!(harness.users.external_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(harness.events.tags(), vec!["external_login_success"]);
}

#[tokio::test]
async fn external_callback_rejects_state_mismatch() {
    let harness = TestHarness::new(test_options());
    let mut jar = BTreeMap::new();
    harness.seed_signin(&mut jar, "s1", &harness.signin_message());
    let challenge = harness
        .state
        .controller
        .external_challenge(&ctx(jar.clone()), Some("s1".into()), Some("google".into()))
        .await
        .unwrap();
    apply_cookies(&mut jar, &challenge.cookies);

    let outcome = harness
        .state
        .controller
        .external_callback(&ctx(jar), Some("tampered".into()))
        .await
        .unwrap();
    match &outcome.action {
        HandlerAction::Html(body) => assert!(body.contains("external_login_failed")),
        other => panic!("expected error view, got {other:?}"),
    }
}
