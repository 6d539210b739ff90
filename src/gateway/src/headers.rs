// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Connection-framing header removal.
//!
//! Values for these headers describe the inbound connection only. The
//! outgoing transport recomputes them for the next hop.

use axum::http::header::{self, HeaderMap, HeaderName};

/// Headers that never cross the proxy in either direction.
pub const FRAMING_HEADERS: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

pub fn is_framing_header(name: &HeaderName) -> bool {
    FRAMING_HEADERS.contains(name)
}

/// Copy of `headers` without the framing headers. Repeated values of every
/// other header are kept in order.
pub fn sanitize(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !is_framing_header(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
