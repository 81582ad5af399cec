// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{CurrentUser, Role, VerifiedIdentity};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// User's unique ID (from the portal)
    pub user_id: String,
    /// User's email address
    pub email: String,
    /// User's role
    pub role: Role,
    /// Display name (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the portal session expires
    pub session_expires_at: DateTime<Utc>,
}

impl From<VerifiedIdentity> for UserMeResponse {
    fn from(user: VerifiedIdentity) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            role: user.role,
            name: user.name,
            session_expires_at: user.expires_at,
        }
    }
}

/// Get the current authenticated user's information.
///
/// Returns the identity the gateway attached from the portal session.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 307, description = "No valid session; redirect to portal login"),
        (status = 401, description = "No valid session (API mode, JSON clients)"),
    )
)]
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<UserMeResponse> {
    Json(user.into())
}
