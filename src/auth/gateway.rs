// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authentication decision.
//!
//! [`Gateway::authenticate`] walks an explicit state machine:
//!
//! ```text
//! Unclassified ──public / OPTIONS──────────────────────────────▶ Passthrough
//!      │
//!      ├──no credential──▶ CredentialMissing ──────────────────▶ Redirect
//!      │
//!      └──credential──▶ CredentialPresent ──▶ CacheHit ────────▶ Authenticated
//!                              │
//!                              └──▶ CacheMiss ──▶ Verifying ──┬▶ Authenticated
//!                                                             └▶ Redirect
//! ```
//!
//! Only `Verifying → Authenticated` writes to the cache. Every failure to
//! verify (invalid, malformed, unreachable) fails closed into `Redirect`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::{header::HOST, HeaderMap, Method, Uri};
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use super::cache::SessionCache;
use super::credential::{self, SessionCredential};
use super::identity::VerifiedIdentity;
use super::routes::RouteClassifier;
use super::verifier::{build_verifier, SessionVerifier, VerificationOutcome};
use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::config::{ConfigError, DeploymentMode, VerificationConfig, VerificationMode};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Terminal outcome of the gateway for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Public route or preflight; downstream runs without identity.
    Passthrough,
    /// Verified; downstream runs with this identity attached.
    Authenticated(VerifiedIdentity),
    /// Not authenticated; send the caller to the portal.
    Redirect { login_url: String },
}

/// Intermediate states. Terminals live in [`Decision`].
enum State {
    Unclassified,
    CredentialMissing,
    CredentialPresent(SessionCredential),
    CacheHit(VerifiedIdentity),
    CacheMiss(SessionCredential),
    Verifying(SessionCredential),
}

/// Gateway counters.
#[derive(Debug, Default)]
pub struct GatewayStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    verified: AtomicU64,
    rejected: AtomicU64,
    malformed: AtomicU64,
    unreachable: AtomicU64,
}

/// Point-in-time copy of [`GatewayStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub sessions_verified: u64,
    pub sessions_rejected: u64,
    pub portal_malformed: u64,
    pub portal_unreachable: u64,
}

impl GatewayStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            sessions_verified: self.verified.load(Ordering::Relaxed),
            sessions_rejected: self.rejected.load(Ordering::Relaxed),
            portal_malformed: self.malformed.load(Ordering::Relaxed),
            portal_unreachable: self.unreachable.load(Ordering::Relaxed),
        }
    }
}

/// The authentication gateway shared by every request.
pub struct Gateway {
    config: Arc<VerificationConfig>,
    routes: RouteClassifier,
    cache: Arc<SessionCache>,
    verifier: Arc<dyn SessionVerifier>,
    audit: Arc<dyn AuditSink>,
    stats: GatewayStats,
}

impl Gateway {
    /// Assemble a gateway around an explicit verifier.
    pub fn new(
        config: Arc<VerificationConfig>,
        verifier: Arc<dyn SessionVerifier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let routes = RouteClassifier::with_defaults(&config.public_paths);
        let cache = Arc::new(SessionCache::new(config.cache_capacity, config.cache_ttl));
        Self {
            config,
            routes,
            cache,
            verifier,
            audit,
            stats: GatewayStats::default(),
        }
    }

    /// Assemble a gateway with the verifier selected by `AUTH_MODE`.
    pub fn from_config(
        config: Arc<VerificationConfig>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        let verifier = build_verifier(&config)?;
        Ok(Self::new(config, verifier, audit))
    }

    pub fn config(&self) -> &Arc<VerificationConfig> {
        &self.config
    }

    pub fn cache(&self) -> Arc<SessionCache> {
        Arc::clone(&self.cache)
    }

    pub fn mode(&self) -> VerificationMode {
        self.verifier.mode()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Forget a session after the user signed out.
    pub fn revoke(&self, credential: &SessionCredential, user_id: &str) {
        self.cache.invalidate(credential);
        self.audit.record(
            AuditEvent::new(AuditEventType::SessionRevoked)
                .with_user(user_id)
                .with_session(credential.short_fingerprint()),
        );
    }

    /// Decide what happens to one inbound request.
    pub async fn authenticate(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Decision {
        let path = uri.path();
        let mut state = State::Unclassified;

        loop {
            state = match state {
                State::Unclassified => {
                    if *method == Method::OPTIONS || !self.routes.requires_auth(path) {
                        return Decision::Passthrough;
                    }
                    match credential::extract(headers, uri, &self.config) {
                        Some(credential) => State::CredentialPresent(credential),
                        None => State::CredentialMissing,
                    }
                }
                State::CredentialMissing => {
                    debug!(path, "no session credential");
                    return self.redirect(uri, headers);
                }
                State::CredentialPresent(credential) => match self.cache.get(&credential) {
                    Some(identity) => State::CacheHit(identity),
                    None => State::CacheMiss(credential),
                },
                State::CacheHit(identity) => {
                    GatewayStats::bump(&self.stats.cache_hits);
                    return Decision::Authenticated(identity);
                }
                State::CacheMiss(credential) => {
                    GatewayStats::bump(&self.stats.cache_misses);
                    State::Verifying(credential)
                }
                State::Verifying(credential) => {
                    let outcome = self.verifier.verify(&credential).await;
                    return self.conclude(&credential, outcome, uri, headers);
                }
            };
        }
    }

    fn conclude(
        &self,
        credential: &SessionCredential,
        outcome: VerificationOutcome,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Decision {
        let path = uri.path();
        let session = credential.short_fingerprint();

        match outcome {
            VerificationOutcome::Valid(identity) if !identity.is_expired() => {
                self.cache.put(credential, identity.clone());
                GatewayStats::bump(&self.stats.verified);
                debug!(%session, user_id = %identity.user_id, role = %identity.role, "session verified");
                self.audit.record(
                    AuditEvent::new(AuditEventType::SessionVerified)
                        .with_user(identity.user_id.clone())
                        .with_session(session)
                        .with_path(path)
                        .with_details(serde_json::json!({ "role": identity.role })),
                );
                Decision::Authenticated(identity)
            }
            VerificationOutcome::Valid(_) | VerificationOutcome::Invalid => {
                GatewayStats::bump(&self.stats.rejected);
                debug!(%session, path, "session rejected");
                self.audit.record(
                    AuditEvent::new(AuditEventType::SessionRejected)
                        .with_session(session)
                        .with_path(path)
                        .failed("session invalid or expired"),
                );
                self.redirect(uri, headers)
            }
            VerificationOutcome::Malformed(reason) => {
                GatewayStats::bump(&self.stats.malformed);
                warn!(target: "portal_contract", %session, path, reason = %reason, "portal returned malformed session data");
                self.audit.record(
                    AuditEvent::new(AuditEventType::SessionMalformed)
                        .with_session(session)
                        .with_path(path)
                        .failed(reason),
                );
                self.redirect(uri, headers)
            }
            VerificationOutcome::Unreachable(reason) => {
                GatewayStats::bump(&self.stats.unreachable);
                error!(
                    target: "portal_availability",
                    %session,
                    path,
                    reason = %reason,
                    portal = %self.config.portal_url,
                    "portal unreachable, failing closed"
                );
                self.audit.record(
                    AuditEvent::new(AuditEventType::PortalUnreachable)
                        .with_session(session)
                        .with_path(path)
                        .failed(reason),
                );
                self.redirect(uri, headers)
            }
        }
    }

    fn redirect(&self, uri: &Uri, headers: &HeaderMap) -> Decision {
        Decision::Redirect {
            login_url: self.config.login_url(&original_url(uri, headers, self.config.deployment)),
        }
    }
}

/// Scheme and host the client used to reach us.
///
/// Behind a proxy these come from `X-Forwarded-Proto` / `X-Forwarded-Host`,
/// otherwise from `Host`; without a proto the scheme follows the deployment.
pub fn request_origin(
    headers: &HeaderMap,
    deployment: DeploymentMode,
) -> Option<(&'static str, &str)> {
    let host = first_value(headers, X_FORWARDED_HOST)
        .or_else(|| first_value(headers, HOST.as_str()))?;
    let scheme = match first_value(headers, X_FORWARDED_PROTO) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        Some(_) => "http",
        None if deployment == DeploymentMode::Production => "https",
        None => "http",
    };
    Some((scheme, host))
}

/// First entry of a possibly comma-separated proxy header.
fn first_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Rebuild the URL the client asked for.
///
/// The request URI is usually origin-form, so scheme and host come from
/// [`request_origin`]. Without any host the bare path is returned.
pub fn original_url(uri: &Uri, headers: &HeaderMap, deployment: DeploymentMode) -> String {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match request_origin(headers, deployment) {
        Some((scheme, host)) => format!("{scheme}://{host}{path_and_query}"),
        None => path_and_query.to_string(),
    }
}
