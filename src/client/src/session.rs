// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Who is signed in, as seen by the client.
//!
//! A `SessionContext` starts out `Resolving`. `mount` asks the gateway once
//! and settles the state to `Authenticated` or `Anonymous`, unless the caller
//! has gone away first. `login` and `logout` move the state directly.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::types::{LoginResponse, User};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Resolving,
    Authenticated(User),
    Anonymous,
}

impl SessionState {
    fn from_user(user: Option<User>) -> Self {
        match user {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Anonymous,
        }
    }
}

#[derive(Clone)]
pub struct SessionContext {
    api: Arc<ApiClient>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(SessionState::Resolving)),
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        match &*self.state.read().await {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub async fn is_resolving(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Resolving)
    }

    /// Starts identity resolution. The result lands only while the returned
    /// guard is alive and nothing else has settled the state meanwhile.
    pub fn mount(&self) -> MountGuard {
        let active = Arc::new(AtomicBool::new(true));
        let api = self.api.clone();
        let state = self.state.clone();
        let flag = active.clone();

        let task = tokio::spawn(async move {
            let resolved = match api.me().await {
                Ok(me) => SessionState::from_user(me.user),
                Err(e) => {
                    tracing::debug!("Identity check failed: {}", e);
                    SessionState::Anonymous
                }
            };

            let mut current = state.write().await;
            if !flag.load(Ordering::Acquire) {
                tracing::debug!("Session view gone, discarding identity result");
                return false;
            }
            if *current != SessionState::Resolving {
                return false;
            }
            *current = resolved;
            true
        });

        MountGuard {
            active,
            task: Some(task),
        }
    }

    /// Caches any returned token before settling the state.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let res = self.api.login(email, password).await?;

        if let Some(token) = res.token.as_deref().filter(|t| !t.is_empty()) {
            if let Err(e) = self.api.tokens().save(token) {
                tracing::warn!("Could not cache session token: {}", e);
            }
        }

        *self.state.write().await = SessionState::from_user(res.user.clone());
        Ok(res)
    }

    /// Always ends `Anonymous` with no cached token.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::debug!("Logout call failed: {}", e);
        }
        if let Err(e) = self.api.tokens().clear() {
            tracing::warn!("Could not clear cached session token: {}", e);
        }
        *self.state.write().await = SessionState::Anonymous;
    }
}

/// Dropping the guard stops a pending identity result from being applied.
/// The request itself still runs to completion.
pub struct MountGuard {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<bool>>,
}

impl MountGuard {
    /// Waits for resolution. `true` if this mount set the state.
    pub async fn resolved(mut self) -> bool {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(false),
            None => false,
        }
    }

    /// Deactivates now; the future reports whether the result was applied anyway.
    pub fn cancel(mut self) -> impl Future<Output = bool> {
        self.active.store(false, Ordering::Release);
        let task = self.task.take();
        async move {
            match task {
                Some(task) => task.await.unwrap_or(false),
                None => false,
            }
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
