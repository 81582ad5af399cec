// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// The gateway itself answers unauthenticated requests with a redirect; these
/// errors cover extractors on routes the gateway let through and API-mode
/// rejections of JSON clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No verified identity on the request
    Unauthenticated,
    /// Identity present but role too weak
    InsufficientPermissions,
    /// JSON client without a valid session; carries the portal login URL
    SessionRequired { login_url: String },
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_url: Option<String>,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::SessionRequired { .. } => "session_required",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated | AuthError::SessionRequired { .. } => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthenticated => write!(f, "Authentication is required"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::SessionRequired { .. } => {
                write!(f, "A valid portal session is required")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.to_string();
        let error_code = self.error_code().to_string();
        let login_url = match self {
            AuthError::SessionRequired { login_url } => Some(login_url),
            _ => None,
        };
        let body = Json(AuthErrorBody {
            error,
            error_code,
            login_url,
        });
        (status, body).into_response()
    }
}
