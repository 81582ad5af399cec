// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stateless session tokens.
//!
//! In `AUTH_MODE=stateless` the session cookie carries an HS256 token signed
//! by the portal with `PORTAL_SECRET`. Verification is entirely local:
//! signature, `exp`, `iss`, `aud` and an optional `nbf` are checked. A token
//! issued by a portal whose clock runs up to 60 seconds ahead is accepted
//! (`nbf` leeway), but `exp` is strict: the gateway rejects identities whose
//! expiry has passed, so a token past `exp` is `Invalid` here as well. No
//! network call is made, so this verifier never reports `Unreachable`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::credential::SessionCredential;
use super::identity::VerifiedIdentity;
use super::roles::Role;
use super::verifier::{SessionVerifier, VerificationOutcome};
use crate::config::{ConfigError, VerificationConfig, VerificationMode};

/// Clock skew tolerance for `nbf` (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims carried by a portal session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (portal user ID)
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before; optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issuer (the portal)
    pub iss: String,

    /// Audience (validated by jsonwebtoken, not read directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Portal role name; missing means least privilege
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl SessionClaims {
    fn into_identity(self) -> Result<VerifiedIdentity, String> {
        let user_id = self.sub.trim().to_string();
        if user_id.is_empty() {
            return Err("empty sub claim".to_string());
        }
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| "missing email claim".to_string())?;
        let expires_at =
            DateTime::from_timestamp(self.exp, 0).ok_or_else(|| "exp out of range".to_string())?;

        Ok(VerifiedIdentity {
            user_id,
            email,
            role: self
                .role
                .as_deref()
                .map(Role::parse_or_default)
                .unwrap_or_default(),
            name: self.name,
            expires_at,
        })
    }
}

/// Verifier for self-contained HS256 session tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &VerificationConfig) -> Result<Self, ConfigError> {
        let secret = config
            .shared_secret
            .as_deref()
            .ok_or(ConfigError::MissingSecret)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.set_issuer(&[&config.token_issuer]);
        validation.set_audience(&[&config.token_audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        if config.token_issuer.trim().is_empty() || config.token_audience.trim().is_empty() {
            return Err(ConfigError::TokenSettings(
                "issuer and audience must not be empty".to_string(),
            ));
        }

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Verify a token synchronously.
    pub fn verify_token(&self, token: &str) -> VerificationOutcome {
        let data = match decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::ExpiredSignature
                    | ErrorKind::ImmatureSignature
                    | ErrorKind::InvalidSignature
                    | ErrorKind::InvalidIssuer
                    | ErrorKind::InvalidAudience
                    | ErrorKind::InvalidAlgorithm => VerificationOutcome::Invalid,
                    _ => VerificationOutcome::Malformed(format!("undecodable token: {e}")),
                }
            }
        };

        // jsonwebtoken applies the leeway to exp too
        if data.claims.exp <= Utc::now().timestamp() {
            return VerificationOutcome::Invalid;
        }

        match data.claims.into_identity() {
            Ok(identity) => VerificationOutcome::Valid(identity),
            Err(reason) => VerificationOutcome::Malformed(reason),
        }
    }
}

#[async_trait]
impl SessionVerifier for TokenVerifier {
    async fn verify(&self, credential: &SessionCredential) -> VerificationOutcome {
        self.verify_token(credential.expose())
    }

    fn mode(&self) -> VerificationMode {
        VerificationMode::Stateless
    }
}
