// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Backend-for-frontend gateway for the bot console.
//!
//! Browser requests arrive on same-origin `/api/*` routes. Each is stripped of
//! framing headers, given an upstream bearer derived from the session cookie,
//! and forwarded to the upstream API either buffered (JSON) or streamed
//! (uploads). Upstream replies are relayed without touching their payload.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod logs;
pub mod proxy;
pub mod routes;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::ProxyError;
pub use routes::router;
pub use types::AppState;
