// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Same-origin resource routes. Each handler checks its method allow-list
//! and forwards to one upstream path.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};

use http_body_util::LengthLimitError;

use crate::error::ProxyError;
use crate::proxy::{encode_segment, stream_body, ProxyRequest};
use crate::types::AppState;

pub type ProxyResult = Result<Response, ProxyError>;

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// 405 unless `method` is in `allowed`.
pub fn allow(method: &Method, allowed: &[Method]) -> Result<(), ProxyError> {
    if allowed.contains(method) {
        Ok(())
    } else {
        Err(ProxyError::method_not_allowed(allowed))
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Buffers at most `max_json_body_bytes`; anything longer is a 413.
pub(crate) async fn read_body(state: &AppState, body: Body) -> Result<Bytes, ProxyError> {
    let limit = state.config.max_json_body_bytes;
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            ProxyError::PayloadTooLarge(limit)
        } else {
            ProxyError::InboundBody(e)
        }
    })
}

async fn forward(state: &AppState, req: Request, path: String, keep_query: bool) -> ProxyResult {
    let (parts, body) = req.into_parts();
    let body = read_body(state, body).await?;
    let query = if keep_query { parts.uri.query() } else { None };

    let proxy_req = ProxyRequest::new(parts.method, path, parts.headers, body)
        .with_query(query)
        .sanitized()
        .with_credential()
        .with_json_defaults();

    Ok(state.upstream.forward_json(proxy_req).await?.into_response())
}

/// Buffered JSON forward.
pub(crate) async fn forward_json(state: &AppState, req: Request, path: impl Into<String>) -> ProxyResult {
    forward(state, req, path.into(), false).await
}

/// Buffered JSON forward that keeps the inbound query string.
pub(crate) async fn forward_json_with_query(state: &AppState, req: Request, path: impl Into<String>) -> ProxyResult {
    forward(state, req, path.into(), true).await
}

/// Unbuffered forward for uploads.
pub(crate) async fn forward_stream(state: &AppState, req: Request, path: impl Into<String>) -> ProxyResult {
    let (parts, body) = req.into_parts();

    let proxy_req = ProxyRequest::new(parts.method, path, parts.headers, stream_body(body))
        .sanitized()
        .with_credential();

    state.upstream.forward_stream(proxy_req).await
}

pub async fn me_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET])?;
    forward_json(&state, req, "/auth/me").await
}

pub async fn register_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;
    forward_json(&state, req, "/auth/register").await
}

pub async fn users_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET])?;
    forward_json_with_query(&state, req, "/auth/users").await
}

pub async fn approve_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;
    forward_json(&state, req, format!("/auth/users/{}/approve", encode_segment(&id))).await
}

pub async fn block_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;
    forward_json(&state, req, format!("/auth/users/{}/block", encode_segment(&id))).await
}

pub async fn frases_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET, Method::POST])?;
    forward_json(&state, req, "/frases").await
}

pub async fn frase_handler(
    State(state): State<AppState>,
    Path(index): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::DELETE])?;
    forward_json(&state, req, format!("/frases/{}", encode_segment(&index))).await
}

/// GET lists media as JSON; POST is a multipart upload streamed through.
pub async fn media_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    match *req.method() {
        Method::GET => forward_json(&state, req, "/media").await,
        Method::POST => forward_stream(&state, req, "/media").await,
        _ => Err(ProxyError::method_not_allowed(&[Method::GET, Method::POST])),
    }
}

pub async fn media_item_handler(
    State(state): State<AppState>,
    Path((kind, filename)): Path<(String, String)>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::DELETE])?;
    let path = format!("/media/{}/{}", encode_segment(&kind), encode_segment(&filename));
    forward_json(&state, req, path).await
}

pub async fn events_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET, Method::POST])?;
    forward_json(&state, req, "/events").await
}

pub async fn event_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::DELETE])?;
    forward_json(&state, req, format!("/events/{}", encode_segment(&id))).await
}

pub async fn triggers_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET, Method::POST])?;
    forward_json(&state, req, "/triggers").await
}

pub async fn trigger_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::PUT, Method::DELETE])?;
    forward_json(&state, req, format!("/triggers/{}", encode_segment(&id))).await
}

pub async fn logs_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET])?;
    forward_json_with_query(&state, req, "/logs").await
}

pub async fn persona_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET, Method::PUT])?;
    forward_json(&state, req, "/persona").await
}

pub async fn schedules_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::GET, Method::POST])?;
    forward_json(&state, req, "/schedules").await
}

pub async fn schedule_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::PUT, Method::DELETE])?;
    forward_json(&state, req, format!("/schedules/{}", encode_segment(&id))).await
}

pub async fn resync_schedules_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;
    forward_json(&state, req, "/schedules/resync").await
}

pub async fn group_context_handler(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    req: Request,
) -> ProxyResult {
    allow(req.method(), &[Method::GET])?;
    forward_json(&state, req, format!("/context/{}", encode_segment(&group_id))).await
}

pub async fn refresh_context_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;
    forward_json(&state, req, "/context/refresh").await
}

pub async fn confessions_handler(State(state): State<AppState>, req: Request) -> ProxyResult {
    allow(req.method(), &[Method::POST])?;
    forward_json(&state, req, "/confessions").await
}
