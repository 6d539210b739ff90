// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Client-side copy of the session token.
//!
//! The gateway cookie stays authoritative. This copy only feeds an explicit
//! `authorization` header when the cookie cannot be relied on.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("Failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored session is corrupt")]
    Corrupt(#[from] serde_json::Error),
}

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, TokenStoreError>;
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    server_url: Option<String>,
}

/// JSON file holding the token and the console it was issued by.
pub struct FileTokenStore {
    path: PathBuf,
    server_url: String,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, server_url: &str) -> Self {
        Self {
            path: path.into(),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<config dir>/bot-console/session.json`
    pub fn default_location(server_url: &str) -> Result<Self, TokenStoreError> {
        let dir = dirs::config_dir()
            .ok_or(TokenStoreError::NoConfigDir)?
            .join("bot-console");
        Ok(Self::new(dir.join("session.json"), server_url))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn is_same_server(&self, session: &StoredSession) -> bool {
        match &session.server_url {
            Some(url) => url.trim_end_matches('/') == self.server_url,
            None => true,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let session: StoredSession = serde_json::from_str(&content)?;
        if !self.is_same_server(&session) {
            tracing::debug!(
                "Stored token belongs to {:?}, not {}",
                session.server_url,
                self.server_url
            );
            return Ok(None);
        }

        Ok(Some(session.token).filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        let session = StoredSession {
            token: token.to_string(),
            server_url: Some(self.server_url.clone()),
        };
        let json = serde_json::to_string_pretty(&session)?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        let token = self.token.lock().unwrap_or_else(|e| e.into_inner());
        Ok(token.clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
