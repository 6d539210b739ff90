// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;

use crate::credentials;
use crate::error::ProxyError;
use crate::headers;

pub const DEFAULT_JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Same set `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single upstream path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, URI_COMPONENT).to_string()
}

/// One outgoing upstream call, built once per inbound request.
///
/// Construction is a pipeline of transforms applied in order:
/// `new` → `sanitized` → `with_credential` → `with_json_defaults` (buffered
/// bodies only).
#[derive(Debug)]
pub struct ProxyRequest<B> {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: B,
}

impl<B> ProxyRequest<B> {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: B) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers,
            body,
        }
    }

    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.filter(|q| !q.is_empty()).map(str::to_string);
        self
    }

    pub fn sanitized(mut self) -> Self {
        self.headers = headers::sanitize(&self.headers);
        self
    }

    /// Must run while the inbound `cookie` header is still present.
    pub fn with_credential(mut self) -> Self {
        credentials::attach_credential(&mut self.headers);
        self
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

impl ProxyRequest<Bytes> {
    /// JSON content-type unless the caller sent one, and an identity
    /// encoding since the reply is relayed as decoded text.
    pub fn with_json_defaults(mut self) -> Self {
        self.headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        self.headers
            .insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        self
    }
}

/// Wrap an inbound body so it is forwarded chunk by chunk.
pub fn stream_body(body: Body) -> reqwest::Body {
    reqwest::Body::wrap_stream(body.into_data_stream())
}

/// Fully-read upstream reply for the JSON path.
#[derive(Debug, Clone)]
pub struct JsonEnvelope {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: String,
}

impl IntoResponse for JsonEnvelope {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        // No overall timeout: uploads and media downloads may run for a long time.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for<B>(&self, req: &ProxyRequest<B>) -> String {
        format!("{}{}", self.base_url, req.path_and_query())
    }

    /// Send a buffered request and read the whole reply as text.
    pub async fn forward_json(&self, req: ProxyRequest<Bytes>) -> Result<JsonEnvelope, ProxyError> {
        let target_url = self.url_for(&req);
        tracing::debug!("Proxying {} {}", req.method, target_url);

        let mut proxy_req = self
            .client
            .request(req.method, &target_url)
            .headers(req.headers);

        if !req.body.is_empty() {
            proxy_req = proxy_req.body(req.body);
        }

        let upstream = proxy_req.send().await?;

        let status = upstream.status();
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_JSON_CONTENT_TYPE));
        let body = upstream.text().await?;

        tracing::debug!("Upstream replied {} for {}", status, target_url);

        Ok(JsonEnvelope {
            status,
            content_type,
            body,
        })
    }

    /// Send a streaming request and pipe the reply back without buffering
    /// either side.
    pub async fn forward_stream(&self, req: ProxyRequest<reqwest::Body>) -> Result<Response, ProxyError> {
        let target_url = self.url_for(&req);
        tracing::debug!("Streaming {} {}", req.method, target_url);

        let upstream = self
            .client
            .request(req.method, &target_url)
            .headers(req.headers)
            .body(req.body)
            .send()
            .await?;

        let status = upstream.status();
        let bodyless = status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
            || upstream.content_length() == Some(0);
        let relayed_headers = headers::sanitize(upstream.headers());

        tracing::debug!("Upstream replied {} for {}", status, target_url);

        let body = if bodyless {
            Body::empty()
        } else {
            Body::from_stream(upstream.bytes_stream())
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = relayed_headers;
        Ok(response)
    }
}
