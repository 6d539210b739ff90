// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Throwaway upstreams for tests.

use axum::{
    extract::Request,
    http::header,
    response::Response,
    Json, Router,
};
use serde_json::{json, Value};

use crate::config::Config;
use crate::types::AppState;

pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn header_str(req: &Request, name: &str) -> Value {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

/// Upstream that describes every request it receives.
pub fn echo_upstream() -> Router {
    Router::new().fallback(|req: Request| async move {
        let described = json!({
            "method": req.method().as_str(),
            "path": req.uri().path(),
            "query": req.uri().query(),
            "host": header_str(&req, header::HOST.as_str()),
            "authorization": header_str(&req, header::AUTHORIZATION.as_str()),
            "content_type": header_str(&req, header::CONTENT_TYPE.as_str()),
            "log_token": header_str(&req, "x-log-token"),
        });
        let body = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
        let mut described = described;
        described["body"] = Value::String(String::from_utf8_lossy(&body).into_owned());
        Json(described)
    })
}

pub fn state_for(upstream_url: &str) -> AppState {
    let config = Config {
        upstream_url: upstream_url.to_string(),
        ..Config::default()
    };
    AppState::new(config).unwrap()
}

pub async fn read_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn read_json(response: Response) -> Value {
    serde_json::from_str(&read_text(response).await).unwrap()
}
