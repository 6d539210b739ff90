// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Failures that originate in the gateway itself. Non-2xx upstream replies
/// are not errors; they are relayed as they are.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("method not allowed")]
    MethodNotAllowed(Vec<Method>),
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("failed to read request body: {0}")]
    InboundBody(#[source] axum::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("LOG_INGEST_TOKEN is not configured")]
    IngestNotConfigured,
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        Self::MethodNotAllowed(allowed.to_vec())
    }
}

fn allow_header(allowed: &[Method]) -> HeaderValue {
    let joined = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            Self::MethodNotAllowed(allowed) => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, allow_header(&allowed))],
                "Method Not Allowed",
            )
                .into_response(),
            Self::PayloadTooLarge(limit) => {
                tracing::warn!("Rejected request body over {} bytes", limit);
                json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
            }
            Self::InboundBody(ref e) => {
                tracing::warn!("Failed to read request body: {:?}", e);
                json_error(StatusCode::BAD_REQUEST, "Failed to read request body")
            }
            Self::Upstream(ref e) => {
                tracing::error!("Proxy request failed: {:?}", e);
                json_error(StatusCode::BAD_GATEWAY, "Upstream service unavailable")
            }
            Self::IngestNotConfigured => {
                tracing::error!("Log ingestion requested but LOG_INGEST_TOKEN is not set");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
            }
            Self::Internal(ref e) => {
                tracing::error!("Application error: {:?}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred")
            }
        }
    }
}
