// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Session cookie handling and cookie-to-bearer translation.
//!
//! Precedence when building an upstream request:
//!
//! 1. A non-empty `auth_token` cookie is authoritative. Its bearer replaces
//!    any `authorization` header the browser sent.
//! 2. Without the cookie, an explicit `authorization` header from the client
//!    (its cached-token fallback) is forwarded as-is. Nothing is added.
//! 3. With neither, the request goes upstream anonymous and upstream decides.
//!
//! Missing or unusable credentials are never an error here.

use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

pub const SESSION_COOKIE: &str = "auth_token";

/// 7 days.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Extract a cookie value by name, parsed per RFC 6265.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_string())
}

/// `Bearer <token>` from the session cookie, if one is present and usable.
pub fn bearer_from_cookies(headers: &HeaderMap) -> Option<HeaderValue> {
    let token = get_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty())?;
    match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring session cookie that is not a valid header value");
            None
        }
    }
}

/// Apply the precedence rules above to an outgoing header map. `headers` is
/// expected to still carry the inbound `cookie` header.
pub fn attach_credential(headers: &mut HeaderMap) {
    if let Some(bearer) = bearer_from_cookies(headers) {
        headers.insert(header::AUTHORIZATION, bearer);
    }
}

/// Session cookie issued after a successful login.
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(SESSION_MAX_AGE_SECS))
        .build()
}

/// Cookie that immediately expires the session (logout).
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_cookie(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_from_session_cookie() {
        let headers = with_cookie("theme=dark; auth_token=T0k3n; other=1");
        assert_eq!(bearer_from_cookies(&headers).unwrap(), "Bearer T0k3n");
    }

    #[test]
    fn test_no_cookie_no_bearer() {
        assert!(bearer_from_cookies(&HeaderMap::new()).is_none());
        assert!(bearer_from_cookies(&with_cookie("theme=dark")).is_none());
        assert!(bearer_from_cookies(&with_cookie("auth_token=")).is_none());
    }

    #[test]
    fn test_attach_without_cookie_adds_nothing() {
        let mut headers = with_cookie("theme=dark");
        attach_credential(&mut headers);
        assert!(!headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_cookie_overrides_client_authorization() {
        let mut headers = with_cookie("auth_token=from-cookie");
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-storage"));
        attach_credential(&mut headers);
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer from-cookie");
    }

    #[test]
    fn test_client_authorization_kept_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-storage"));
        attach_credential(&mut headers);
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer from-storage");
    }

    #[test]
    fn test_session_cookie_attributes() {
        let rendered = session_cookie("T", false).to_string();
        assert!(rendered.starts_with("auth_token=T"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
        assert!(!rendered.contains("Secure"));

        assert!(session_cookie("T", true).to_string().contains("Secure"));
    }

    #[test]
    fn test_expired_cookie_clears_session() {
        let rendered = expired_session_cookie(false).to_string();
        assert!(rendered.starts_with("auth_token=;"));
        assert!(rendered.contains("Max-Age=0"));
    }
}
