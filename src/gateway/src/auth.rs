// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Login and logout. Credential checks and token issuance happen upstream;
//! these handlers only move the token into and out of the session cookie.

use std::time::Duration;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::credentials;
use crate::handlers::{allow, read_body, ProxyResult};
use crate::proxy::ProxyRequest;
use crate::types::AppState;

/// Upper bound on the best-effort upstream logout.
const UPSTREAM_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

fn set_cookie_header(cookie: &axum_extra::extract::cookie::Cookie<'_>) -> anyhow::Result<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string()).context("Session cookie is not a valid header value")
}

pub async fn login_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;

    let body = read_body(&state, req.into_body()).await?;
    let body = if body.is_empty() { Bytes::from_static(b"{}") } else { body };

    let proxy_req = ProxyRequest::new(Method::POST, "/auth/login", HeaderMap::new(), body)
        .with_json_defaults();
    let upstream = state.upstream.forward_json(proxy_req).await?;

    let data: Value = serde_json::from_str(&upstream.body).unwrap_or_else(|_| json!({}));

    if !upstream.status.is_success() {
        tracing::debug!("Upstream rejected login with {}", upstream.status);
        return Ok((upstream.status, Json(data)).into_response());
    }

    let mut response = (StatusCode::OK, Json(&data)).into_response();

    if let Some(token) = data.get("token").and_then(Value::as_str) {
        let cookie = credentials::session_cookie(token, state.config.secure_cookies());
        response
            .headers_mut()
            .append(header::SET_COOKIE, set_cookie_header(&cookie)?);
        tracing::debug!("Login succeeded, session cookie issued");
    } else {
        tracing::warn!("Upstream login succeeded without a token; no session cookie set");
    }

    Ok(response)
}

/// Always clears the cookie. The upstream call is informational only.
pub async fn logout_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;

    let (parts, _body) = req.into_parts();
    let proxy_req = ProxyRequest::new(Method::POST, "/auth/logout", parts.headers, Bytes::new())
        .sanitized()
        .with_credential()
        .with_json_defaults();

    match tokio::time::timeout(UPSTREAM_LOGOUT_TIMEOUT, state.upstream.forward_json(proxy_req)).await {
        Ok(Ok(reply)) if !reply.status.is_success() => {
            tracing::warn!("Upstream logout returned {}", reply.status);
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::warn!("Upstream logout failed: {}", e);
        }
        Err(_) => {
            tracing::warn!("Upstream logout timed out");
        }
    }

    let cookie = credentials::expired_session_cookie(state.config.secure_cookies());
    let mut response = (StatusCode::OK, Json(json!({ "success": true }))).into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, set_cookie_header(&cookie)?);

    Ok(response)
}
