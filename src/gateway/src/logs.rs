// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Browser log shipping. The shared secret lives only in gateway config and
//! is attached here; the browser never sees it.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use crate::error::ProxyError;
use crate::handlers::{allow, read_body, ProxyResult};
use crate::proxy::ProxyRequest;
use crate::types::AppState;

pub const LOG_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-log-token");

pub async fn ingest_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;

    let token = state
        .config
        .log_ingest_token
        .as_deref()
        .ok_or(ProxyError::IngestNotConfigured)?;

    let body = read_body(&state, req.into_body()).await?;
    let body = if body.is_empty() { Bytes::from_static(b"{}") } else { body };

    let mut headers = HeaderMap::new();
    headers.insert(
        LOG_TOKEN_HEADER,
        HeaderValue::from_str(token).context("LOG_INGEST_TOKEN is not a valid header value")?,
    );

    let proxy_req = ProxyRequest::new(Method::POST, "/logs/ingest", headers, body)
        .with_json_defaults();
    let upstream = state.upstream.forward_json(proxy_req).await?;

    // Replies are always JSON to the browser, even when upstream sent text.
    let data = serde_json::from_str::<Value>(&upstream.body)
        .unwrap_or(Value::String(upstream.body));

    Ok((upstream.status, Json(data)).into_response())
}
