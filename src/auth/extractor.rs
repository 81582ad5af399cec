// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the gateway-verified identity.
//!
//! The session gateway middleware has already done all verification by the
//! time a handler runs, so these extractors only read request extensions.
//! They work with any router state.
//!
//! ```rust,ignore
//! async fn my_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     // user is VerifiedIdentity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{identity, AuthError, Role, VerifiedIdentity};

/// Extractor for the authenticated user.
///
/// Rejects with `401` if the gateway did not attach an identity, which only
/// happens on public routes.
pub struct CurrentUser(pub VerifiedIdentity);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity(&parts.extensions)
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Optional authentication extractor.
///
/// Returns `None` instead of rejecting.
pub struct OptionalUser(pub Option<VerifiedIdentity>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(identity(&parts.extensions).cloned()))
    }
}

fn require(parts: &Parts, role: Role) -> Result<VerifiedIdentity, AuthError> {
    let user = identity(&parts.extensions).ok_or(AuthError::Unauthenticated)?;
    if !user.has_role(role) {
        tracing::debug!(user_id = %user.user_id, have = %user.role, need = %role, "role check failed");
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(user.clone())
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub VerifiedIdentity);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, Role::Admin).map(AdminOnly)
    }
}

/// Extractor that requires HR privileges (HR staff or admin).
pub struct RequireHr(pub VerifiedIdentity);

impl<S: Send + Sync> FromRequestParts<S> for RequireHr {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, Role::Hr).map(RequireHr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::tests::sample_identity;
    use axum::http::Request;

    fn parts_with(identity: Option<VerifiedIdentity>) -> Parts {
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        if let Some(identity) = identity {
            parts.extensions.insert(identity);
        }
        parts
    }

    fn with_role(role: Role) -> VerifiedIdentity {
        VerifiedIdentity {
            role,
            ..sample_identity()
        }
    }

    #[tokio::test]
    async fn current_user_requires_identity() {
        let mut parts = parts_with(None);
        let result = CurrentUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn current_user_reads_extensions() {
        let mut parts = parts_with(Some(sample_identity()));
        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_id, "42");
        assert_eq!(user.email, "a@b.com");
    }

    #[tokio::test]
    async fn optional_user_never_rejects() {
        let mut parts = parts_with(None);
        let OptionalUser(user) = OptionalUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(user.is_none());

        let mut parts = parts_with(Some(sample_identity()));
        let OptionalUser(user) = OptionalUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn admin_only_rejects_other_roles() {
        let mut parts = parts_with(Some(with_role(Role::Hr)));
        let result = AdminOnly::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let mut parts = parts_with(Some(with_role(Role::Admin)));
        assert!(AdminOnly::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn require_hr_accepts_hr_and_admin() {
        for role in [Role::Hr, Role::Admin] {
            let mut parts = parts_with(Some(with_role(role)));
            assert!(RequireHr::from_request_parts(&mut parts, &()).await.is_ok(), "{role}");
        }
        for role in [Role::Recruiter, Role::Interviewer, Role::Employee] {
            let mut parts = parts_with(Some(with_role(role)));
            let result = RequireHr::from_request_parts(&mut parts, &()).await;
            assert!(matches!(result, Err(AuthError::InsufficientPermissions)), "{role}");
        }
    }

    #[tokio::test]
    async fn role_extractors_without_identity_are_unauthenticated() {
        let mut parts = parts_with(None);
        let result = RequireHr::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }
}
