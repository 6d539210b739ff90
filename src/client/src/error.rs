// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;

use reqwest::StatusCode;

use crate::token_store::TokenStoreError;

/// Fallback message when a failed response carries nothing readable.
pub const UNEXPECTED_ERROR: &str = "Unexpected error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx reply, or a reply that claimed JSON and was not.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Could not reach the console")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid console URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

impl ApiError {
    /// One human-readable line for the UI.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
