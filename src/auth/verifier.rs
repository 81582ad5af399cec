// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session verification contract.
//!
//! The gateway only ever talks to a [`SessionVerifier`]. Which implementation
//! backs it is decided once by `AUTH_MODE`:
//!
//! - `remote` → [`PortalVerifier`](super::portal::PortalVerifier), a lookup at
//!   the portal's validation endpoint
//! - `stateless` → [`TokenVerifier`](super::token::TokenVerifier), local HS256
//!   signature and claim checks

use std::sync::Arc;

use async_trait::async_trait;

use super::credential::SessionCredential;
use super::identity::VerifiedIdentity;
use super::portal::PortalVerifier;
use super::token::TokenVerifier;
use crate::config::{ConfigError, VerificationConfig, VerificationMode};

/// Result of verifying one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The session is live; here is who owns it.
    Valid(VerifiedIdentity),
    /// The session does not exist, expired or was revoked.
    Invalid,
    /// The portal could not be reached in time.
    Unreachable(String),
    /// The portal answered with data that fails the identity contract.
    Malformed(String),
}

impl VerificationOutcome {
    /// Short label for logs and audit records.
    pub fn label(&self) -> &'static str {
        match self {
            VerificationOutcome::Valid(_) => "valid",
            VerificationOutcome::Invalid => "invalid",
            VerificationOutcome::Unreachable(_) => "unreachable",
            VerificationOutcome::Malformed(_) => "malformed",
        }
    }
}

/// Anything able to turn a session credential into an outcome.
///
/// Implementations must not panic and must convert every transport or
/// parsing failure into an outcome.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, credential: &SessionCredential) -> VerificationOutcome;

    fn mode(&self) -> VerificationMode;
}

/// Build the verifier selected by the configuration.
pub fn build_verifier(config: &VerificationConfig) -> Result<Arc<dyn SessionVerifier>, ConfigError> {
    let verifier: Arc<dyn SessionVerifier> = match config.mode {
        VerificationMode::Remote => Arc::new(PortalVerifier::new(config)?),
        VerificationMode::Stateless => Arc::new(TokenVerifier::new(config)?),
    };
    Ok(verifier)
}
