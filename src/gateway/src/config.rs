// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use anyhow::{Context, Result};
use std::env;
use url::Url;

pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct Config {
    /// Upstream API base, without a trailing slash.
    pub upstream_url: String,
    pub bind_address: String,
    pub port: u16,
    pub environment: String,
    pub log_ingest_token: Option<String>,
    pub max_json_body_bytes: usize,
    pub upstream_connect_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub frontend_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let upstream_url = env::var("BACKEND_API_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_API_BASE_URL"))
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());

        Url::parse(&upstream_url)
            .context("Invalid BACKEND_API_URL")?;
        let upstream_url = upstream_url.trim_end_matches('/').to_string();

        let bind_address = env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .context("Invalid PORT")?;

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        // Empty means unset: ingestion must fail closed.
        let log_ingest_token = env::var("LOG_INGEST_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let max_json_body_bytes = env::var("MAX_JSON_BODY_BYTES")
            .unwrap_or_else(|_| (1024 * 1024).to_string())
            .parse()
            .context("Invalid MAX_JSON_BODY_BYTES")?;

        let upstream_connect_timeout_secs = env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Invalid UPSTREAM_CONNECT_TIMEOUT_SECS")?;

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        for origin in cors_origins.iter() {
            Url::parse(origin.as_str())
                .with_context(|| format!("Invalid origin in CORS_ORIGINS: {}", origin))?;
        }

        let frontend_dir = env::var("FRONTEND_DIR").ok().filter(|d| !d.is_empty());

        Ok(Config {
            upstream_url,
            bind_address,
            port,
            environment,
            log_ingest_token,
            max_json_body_bytes,
            upstream_connect_timeout_secs,
            cors_origins,
            frontend_dir,
        })
    }

    /// Cookies get the `Secure` flag only in production-like environments.
    pub fn secure_cookies(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "staging")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            environment: "development".to_string(),
            log_ingest_token: None,
            max_json_body_bytes: 1024 * 1024,
            upstream_connect_timeout_secs: 10,
            cors_origins: Vec::new(),
            frontend_dir: None,
        }
    }
}
