// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cross-application session authentication for the HR backend. Sessions are
//! owned by the central portal; this module only decides, per request,
//! whether the caller holds one.
//!
//! ## Auth Flow
//!
//! 1. User signs in at the portal, which redirects to `/auth/callback`
//! 2. Callback stores the session identifier in the `session_id` cookie
//! 3. On every request the gateway:
//!    - skips public routes and CORS preflights
//!    - reads the credential (cookie, then `x-session-id` header)
//!    - serves it from the validation cache, or asks the verifier
//!    - attaches [`VerifiedIdentity`] or redirects to the portal login
//!
//! ## Security
//!
//! - Fails closed: an unreachable or misbehaving portal means no access
//! - Negative results are never cached
//! - Raw credentials never appear in logs, only SHA-256 fingerprints
//! - Stateless tokens get 60 seconds of `nbf` clock skew tolerance; `exp` is strict

pub mod cache;
pub mod credential;
pub mod error;
pub mod extractor;
pub mod gateway;
pub mod identity;
pub mod middleware;
pub mod portal;
pub mod roles;
pub mod routes;
pub mod token;
pub mod verifier;

pub use cache::{CacheSweeper, SessionCache};
pub use credential::SessionCredential;
pub use error::AuthError;
pub use extractor::{AdminOnly, CurrentUser, OptionalUser, RequireHr};
pub use gateway::{Decision, Gateway, StatsSnapshot};
pub use identity::{identity, VerifiedIdentity};
pub use middleware::session_gateway;
pub use roles::Role;
pub use routes::RouteClassifier;
pub use verifier::{build_verifier, SessionVerifier, VerificationOutcome};
