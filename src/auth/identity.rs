// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified identity attached to authenticated requests.

use axum::http::Extensions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Identity established by a successful session verification.
///
/// The gateway inserts exactly one of these into the request extensions of
/// every request that reaches a protected handler. Handlers read it through
/// [`identity`] or the `CurrentUser` extractor; its absence means the route
/// was public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerifiedIdentity {
    /// Portal user identifier
    pub user_id: String,

    /// User's email address
    pub email: String,

    /// User's role
    pub role: Role,

    /// Display name (if the portal supplied one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// When the underlying session stops being valid
    pub expires_at: DateTime<Utc>,
}

impl VerifiedIdentity {
    /// Whether the session behind this identity has passed its own expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Read the identity the gateway attached to a request.
pub fn identity(extensions: &Extensions) -> Option<&VerifiedIdentity> {
    extensions.get::<VerifiedIdentity>()
}
