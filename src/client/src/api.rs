// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Typed calls against the gateway's same-origin `/api` routes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, multipart, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{ApiError, UNEXPECTED_ERROR};
use crate::media::MediaKind;
use crate::token_store::TokenStore;
use crate::types::{
    Confession, LogEntry, LogLevel, LoginRequest, LoginResponse, MeResponse, NewEvent, NewFrase,
    RegisterRequest,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Every call sends the cookie jar and, when one is cached, an explicit bearer.
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url,
            client,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// `<base>/api/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url);
        match self.tokens.load() {
            Ok(Some(token)) => builder = builder.bearer_auth(token),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring cached token: {}", e),
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        handle_response(response).await
    }

    async fn get(&self, segments: &[&str]) -> Result<Value, ApiError> {
        self.send(self.request(Method::GET, segments)?).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<Value, ApiError> {
        self.send(self.request(Method::DELETE, segments)?).await
    }

    async fn post_empty(&self, segments: &[&str]) -> Result<Value, ApiError> {
        self.send(self.request(Method::POST, segments)?).await
    }

    async fn send_json<B: Serialize + ?Sized>(&self, method: Method, segments: &[&str], body: &B) -> Result<Value, ApiError> {
        self.send(self.request(method, segments)?.json(body)).await
    }

    // Auth

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest { email, password };
        let reply = self
            .send(self.request(Method::POST, &["auth", "login"])?.json(&body))
            .await?;
        Ok(LoginResponse::from_body(&reply))
    }

    pub async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<Value, ApiError> {
        let body = RegisterRequest { email, password, name };
        self.send_json(Method::POST, &["auth", "register"], &body).await
    }

    pub async fn me(&self) -> Result<MeResponse, ApiError> {
        let reply = self.get(&["auth", "me"]).await?;
        Ok(MeResponse::from_body(&reply))
    }

    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.post_empty(&["auth", "logout"]).await
    }

    pub async fn list_users(&self) -> Result<Value, ApiError> {
        self.get(&["auth", "users"]).await
    }

    pub async fn approve_user(&self, id: &str) -> Result<Value, ApiError> {
        self.post_empty(&["auth", "users", id, "approve"]).await
    }

    pub async fn block_user(&self, id: &str) -> Result<Value, ApiError> {
        self.post_empty(&["auth", "users", id, "block"]).await
    }

    // Phrases

    pub async fn get_frases(&self) -> Result<Value, ApiError> {
        self.get(&["frases"]).await
    }

    pub async fn add_frase(&self, frase: &str) -> Result<Value, ApiError> {
        self.send_json(Method::POST, &["frases"], &NewFrase { frase }).await
    }

    pub async fn delete_frase_by_index(&self, index: usize) -> Result<Value, ApiError> {
        let index = index.to_string();
        self.delete(&["frases", index.as_str()]).await
    }

    // Media

    pub async fn get_media(&self) -> Result<Value, ApiError> {
        self.get(&["media"]).await
    }

    /// Streams the file from disk as a multipart upload.
    pub async fn upload_media(&self, path: &Path) -> Result<Value, ApiError> {
        let io_error = |source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let kind = MediaKind::from_file_name(&file_name);

        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let len = file.metadata().await.map_err(io_error)?.len();

        let part = multipart::Part::stream_with_length(file, len).file_name(file_name);
        let form = multipart::Form::new()
            .text("type", kind.as_str())
            .part("file", part);

        tracing::debug!("Uploading {} as {}", path.display(), kind);
        self.send(self.request(Method::POST, &["media"])?.multipart(form))
            .await
    }

    pub async fn delete_media(&self, kind: &str, filename: &str) -> Result<Value, ApiError> {
        self.delete(&["media", kind, filename]).await
    }

    // Events

    pub async fn get_events(&self) -> Result<Value, ApiError> {
        self.get(&["events"]).await
    }

    pub async fn create_event(&self, name: &str, date: &str) -> Result<Value, ApiError> {
        self.send_json(Method::POST, &["events"], &NewEvent { name, date })
            .await
    }

    pub async fn delete_event(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&["events", id]).await
    }

    // Triggers

    pub async fn get_triggers(&self) -> Result<Value, ApiError> {
        self.get(&["triggers"]).await
    }

    pub async fn create_trigger(&self, payload: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::POST, &["triggers"], payload).await
    }

    pub async fn update_trigger(&self, id: &str, payload: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &["triggers", id], payload).await
    }

    pub async fn delete_trigger(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&["triggers", id]).await
    }

    // Logs

    pub async fn get_logs(&self, limit: Option<u32>, source: Option<&str>) -> Result<Value, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }
        if let Some(source) = source.filter(|s| !s.is_empty()) {
            query.push(("source", source.to_string()));
        }

        let mut builder = self.request(Method::GET, &["logs"])?;
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        self.send(builder).await
    }

    /// Ships one client-side log line. Never fails; empty messages are dropped.
    pub async fn log_event(&self, level: LogLevel, message: &str, meta: Option<&Value>) {
        if message.is_empty() {
            return;
        }

        let entry = LogEntry {
            source: "frontend",
            level,
            message,
            meta,
        };

        let result = match self.request(Method::POST, &["logs", "ingest"]) {
            Ok(builder) => builder.json(&entry).send().await.map_err(ApiError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!("Dropped log event: {}", e);
        }
    }

    // Persona

    pub async fn get_persona(&self) -> Result<Value, ApiError> {
        self.get(&["persona"]).await
    }

    pub async fn update_persona(&self, persona: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &["persona"], persona).await
    }

    // Schedules

    pub async fn get_schedules(&self) -> Result<Value, ApiError> {
        self.get(&["schedules"]).await
    }

    pub async fn create_schedule(&self, payload: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::POST, &["schedules"], payload).await
    }

    pub async fn update_schedule(&self, id: &str, payload: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &["schedules", id], payload).await
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&["schedules", id]).await
    }

    pub async fn resync_schedules(&self) -> Result<Value, ApiError> {
        self.post_empty(&["schedules", "resync"]).await
    }

    // Group context

    pub async fn get_group_context(&self, group_id: &str) -> Result<Value, ApiError> {
        self.get(&["context", group_id]).await
    }

    pub async fn refresh_group_context(&self, payload: Option<&Value>) -> Result<Value, ApiError> {
        match payload {
            Some(body) => self.send_json(Method::POST, &["context", "refresh"], body).await,
            None => self.post_empty(&["context", "refresh"]).await,
        }
    }

    pub async fn send_confession(&self, message: &str) -> Result<Value, ApiError> {
        self.send_json(Method::POST, &["confessions"], &Confession { message })
            .await
    }
}

/// JSON if the reply says so, text otherwise; non-2xx becomes `ApiError::Status`.
async fn handle_response(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let text = response.text().await?;

    let body = if is_json {
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Response claimed JSON but did not parse: {}", e);
                return Err(ApiError::Status {
                    status,
                    message: non_empty_or_default(text),
                });
            }
        }
    } else {
        Value::String(text)
    };

    if status.is_success() {
        return Ok(body);
    }

    let message = match body {
        Value::Object(ref map) => map
            .get("error")
            .and_then(error_field_message)
            .unwrap_or_else(|| UNEXPECTED_ERROR.to_string()),
        Value::String(text) => non_empty_or_default(text),
        _ => UNEXPECTED_ERROR.to_string(),
    };

    Err(ApiError::Status { status, message })
}

/// Readable text for an upstream `error` field of any JSON type. Falsy
/// values (`null`, `false`, `0`, `""`) carry no message.
fn error_field_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
        other => Some(other.to_string()),
    }
}

fn non_empty_or_default(text: String) -> String {
    if text.is_empty() {
        UNEXPECTED_ERROR.to_string()
    } else {
        text
    }
}
