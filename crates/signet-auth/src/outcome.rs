//! Handler outcomes and the explicit request context.
//!
//! Controllers are plain services: they receive a [`RequestContext`]
//! assembled at the HTTP edge and return a [`HandlerOutcome`]. The axum
//! layer converts outcomes into responses, so the state machines stay
//! testable without a running server.

use crate::claims::ClaimsIdentity;
use crate::cookies::parse_cookies;
use crate::signin::{schemes, AuthCookieIssuer};
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;

/// What the transport layer should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerAction {
    /// 302 redirect.
    Redirect(String),
    /// 200 with rendered HTML.
    Html(String),
    /// 200 with an auto-posting HTML form.
    FormPost(String),
    /// Plain status with a short body.
    Status(u16, String),
}

/// A controller decision plus the cookies to emit with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// The transport action.
    pub action: HandlerAction,
    /// `Set-Cookie` values, in order.
    pub cookies: Vec<String>,
}

impl HandlerOutcome {
    /// A redirect outcome.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            action: HandlerAction::Redirect(url.into()),
            cookies: Vec::new(),
        }
    }

    /// A rendered page outcome.
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            action: HandlerAction::Html(body.into()),
            cookies: Vec::new(),
        }
    }

    /// An auto-posting form outcome.
    pub fn form_post(body: impl Into<String>) -> Self {
        Self {
            action: HandlerAction::FormPost(body.into()),
            cookies: Vec::new(),
        }
    }

    /// A bare status outcome.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            action: HandlerAction::Status(code, message.into()),
            cookies: Vec::new(),
        }
    }

    /// Attach one `Set-Cookie` value.
    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Attach several `Set-Cookie` values.
    pub fn with_cookies(mut self, cookies: impl IntoIterator<Item = String>) -> Self {
        self.cookies.extend(cookies);
        self
    }
}

impl IntoResponse for HandlerOutcome {
    fn into_response(self) -> Response {
        let mut response = match self.action {
            HandlerAction::Redirect(url) => {
                let mut r = Response::new(axum::body::Body::empty());
                *r.status_mut() = StatusCode::FOUND;
                if let Ok(location) = HeaderValue::from_str(&url) {
                    r.headers_mut().insert(header::LOCATION, location);
                }
                r
            }
            HandlerAction::Html(body) | HandlerAction::FormPost(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            HandlerAction::Status(code, message) => (
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            )
                .into_response(),
        };

        // Interactive pages and redirects carry flow state; never cache.
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, max-age=0"),
        );
        response
            .headers_mut()
            .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        for cookie in self.cookies {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// Everything a controller needs from the transport: parsed cookies and
/// the authenticated principal, with no ambient state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request cookies by name.
    pub cookies: BTreeMap<String, String>,
    /// Primary-scheme identity, when a full session exists.
    pub principal: Option<ClaimsIdentity>,
}

impl RequestContext {
    /// Build the context from request headers, resolving the primary
    /// identity through the cookie issuer.
    pub fn from_headers(headers: &HeaderMap, issuer: &AuthCookieIssuer) -> Self {
        let cookies = parse_cookies(headers);
        let principal = issuer.read(&cookies, schemes::PRIMARY);
        Self { cookies, principal }
    }

    /// Whether a full session is present.
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_outcome_sets_location_and_no_store() {
        let response = HandlerOutcome::redirect("https://app/cb?code=x")
            .with_cookie("a=1; Path=/".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://app/cb?code=x"
        );
        assert!(response
            .headers()
            .get(header::CACHE_CONTROL)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("no-store"));
        assert_eq!(response.headers().get(header::SET_COOKIE).unwrap(), "a=1; Path=/");
    }

    #[test]
    fn status_outcome_preserves_code() {
        let response = HandlerOutcome::status(405, "local login disabled").into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
