// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session gateway middleware for Axum.
//!
//! Applied to the whole router:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/jobs", get(list_jobs))
//!     .layer(axum::middleware::from_fn_with_state(gateway, session_gateway));
//! ```
//!
//! Unauthenticated requests to protected routes never reach the handler.
//! Browsers get `307 Temporary Redirect` to the portal login page; with
//! `GATEWAY_API_MODE` on, JSON clients get `401` with the login URL instead.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::gateway::{Decision, Gateway};
use super::AuthError;

/// Authentication middleware function.
pub async fn session_gateway(
    State(gateway): State<Arc<Gateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = gateway
        .authenticate(request.method(), request.uri(), request.headers())
        .await;

    match decision {
        Decision::Passthrough => next.run(request).await,
        Decision::Authenticated(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Decision::Redirect { login_url } => {
            if gateway.config().api_mode && is_json_client(request.headers()) {
                AuthError::SessionRequired { login_url }.into_response()
            } else {
                Redirect::temporary(&login_url).into_response()
            }
        }
    }
}

/// Whether the caller speaks JSON rather than HTML.
fn is_json_client(headers: &HeaderMap) -> bool {
    [ACCEPT, CONTENT_TYPE].iter().any(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("application/json"))
    })
}
