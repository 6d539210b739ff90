// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::proxy::UpstreamClient;

/// Shared by every handler. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let upstream = UpstreamClient::new(
            &config.upstream_url,
            Duration::from_secs(config.upstream_connect_timeout_secs),
        )
        .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            upstream,
        })
    }
}
