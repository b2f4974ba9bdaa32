//! Session transport: carries the raw credential in an HTTP-only cookie.
//!
//! The transport never looks inside the token. Browser clients use the
//! cookie; non-browser clients may send `Authorization: Bearer <token>`.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
};
use axum::response::Response;
use chrono::Utc;
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, SameSite};

use super::{AuthError, Credential};

/// Default cookie name for the session artifact.
pub const DEFAULT_COOKIE_NAME: &str = "token";

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// Builds, reads and clears the session cookie.
#[derive(Debug, Clone)]
pub struct SessionTransport {
    cookie_name: String,
    secure: bool,
}

impl SessionTransport {
    /// Create a transport. `secure` adds the `Secure` attribute, which
    /// must be off for plain-http development servers.
    pub fn new(cookie_name: impl Into<String>, secure: bool) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secure,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Attach the credential to a response, replacing any previous artifact.
    pub fn attach(&self, response: &mut Response, credential: &Credential) -> Result<(), AuthError> {
        let value = self.session_cookie(credential, Utc::now().timestamp())?;
        response.headers_mut().append(SET_COOKIE, value);
        Ok(())
    }

    /// Overwrite the artifact with an immediately expired one.
    pub fn clear(&self, response: &mut Response) -> Result<(), AuthError> {
        let value = self.removal_cookie()?;
        response.headers_mut().append(SET_COOKIE, value);
        Ok(())
    }

    /// Read the raw token from a request, if any.
    ///
    /// The cookie takes precedence over the Authorization header.
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        self.extract_cookie(headers).or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(bearer_token_from_header)
                .map(str::to_string)
        })
    }

    fn extract_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.cookie_name && !c.value().is_empty())
            .map(|c| c.value().to_string())
    }

    /// `Set-Cookie` value for a credential, with a lifetime that ends at the
    /// credential's own expiry.
    pub fn session_cookie(&self, credential: &Credential, now: i64) -> Result<HeaderValue, AuthError> {
        let remaining = (credential.expires_at() - now).max(0);

        let mut builder = Cookie::build((self.cookie_name.clone(), credential.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .max_age(CookieDuration::seconds(remaining));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(credential.expires_at()) {
            builder = builder.expires(expires);
        }

        to_header_value(builder.build())
    }

    /// `Set-Cookie` value that deletes the session artifact.
    pub fn removal_cookie(&self) -> Result<HeaderValue, AuthError> {
        let mut cookie = Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .build();
        cookie.make_removal();
        to_header_value(cookie)
    }
}

fn to_header_value(cookie: Cookie<'_>) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AuthError::Internal(format!("invalid session cookie: {e}")))
}
