// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal session lookup.
//!
//! Asks the central portal whether a session identifier is live:
//!
//! ```text
//! POST {PORTAL_URL}/auth/validate-session
//! Cookie: session_id=<credential>
//! {"session_id": "<credential>"}
//! ```
//!
//! ## Outcome mapping
//!
//! | Portal answer | Outcome | Retried |
//! |---------------|---------|---------|
//! | 2xx, `valid: true`, complete identity | `Valid` | - |
//! | 2xx `valid: false`, 401/403/404/410 | `Invalid` | no |
//! | 2xx with bad/incomplete payload, other 4xx | `Malformed` | no |
//! | transport error, attempt timeout, 5xx, 429 | `Unreachable` | yes |
//!
//! Retries use exponential backoff with full jitter and never run past the
//! verification budget, so a stalled portal costs at most `VERIFY_BUDGET_MS`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::credential::{is_cookie_safe, SessionCredential};
use super::identity::VerifiedIdentity;
use super::roles::Role;
use super::verifier::{SessionVerifier, VerificationOutcome};
use crate::config::{ConfigError, VerificationConfig, VerificationMode};

#[derive(Serialize)]
struct ValidateSessionRequest<'a> {
    session_id: &'a str,
}

/// Session payload returned by the portal.
///
/// Field names follow the portal's `validate-session` response.
#[derive(Debug, Deserialize)]
struct PortalSessionPayload {
    valid: Option<bool>,
    user_id: Option<serde_json::Value>,
    email: Option<String>,
    name: Option<String>,
    role: Option<String>,
    user_type: Option<String>,
    is_system_admin: Option<bool>,
    expires_at: Option<serde_json::Value>,
    session_data: Option<PortalSessionData>,
}

#[derive(Debug, Deserialize)]
struct PortalSessionData {
    expires_at: Option<serde_json::Value>,
}

impl PortalSessionPayload {
    fn into_identity(self) -> Result<VerifiedIdentity, String> {
        let user_id = match self.user_id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err("missing user_id".to_string()),
        };

        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| "missing email".to_string())?;

        let role = if self.is_system_admin == Some(true) {
            Role::Admin
        } else {
            self.role
                .or(self.user_type)
                .filter(|r| !r.trim().is_empty())
                .map(|r| Role::parse_or_default(&r))
                .ok_or_else(|| "missing role".to_string())?
        };

        let expires_at = self
            .expires_at
            .or_else(|| self.session_data.and_then(|d| d.expires_at))
            .ok_or_else(|| "missing expires_at".to_string())
            .and_then(|v| parse_instant(&v).ok_or_else(|| format!("unparseable expires_at: {v}")))?;

        Ok(VerifiedIdentity {
            user_id,
            email,
            role,
            name: self.name.filter(|n| !n.trim().is_empty()),
            expires_at,
        })
    }
}

/// Parse an RFC 3339 timestamp, a naive ISO-8601 timestamp (read as UTC) or
/// unix seconds.
fn parse_instant(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        serde_json::Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| naive.and_utc())
                })
        }
        _ => None,
    }
}

/// Classify a successful-status response body.
fn classify_payload(body: &[u8]) -> VerificationOutcome {
    let payload: PortalSessionPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return VerificationOutcome::Malformed(format!("invalid JSON payload: {e}")),
    };

    match payload.valid {
        Some(true) => {}
        Some(false) => return VerificationOutcome::Invalid,
        None => return VerificationOutcome::Malformed("missing valid flag".to_string()),
    }

    match payload.into_identity() {
        Ok(identity) if identity.is_expired() => VerificationOutcome::Invalid,
        Ok(identity) => VerificationOutcome::Valid(identity),
        Err(reason) => VerificationOutcome::Malformed(reason),
    }
}

/// Result of a single HTTP attempt.
enum Attempt {
    Done(VerificationOutcome),
    Retryable(String),
}

/// Full-jitter exponential backoff: uniform in `[0, base * 2^attempt]`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let cap = (base.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
    if cap == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=cap))
}

/// Verifier backed by the portal's validation endpoint.
#[derive(Clone)]
pub struct PortalVerifier {
    endpoint: String,
    cookie_name: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    budget: Duration,
    client: reqwest::Client,
}

impl PortalVerifier {
    pub fn new(config: &VerificationConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: config.validation_endpoint(),
            cookie_name: config.cookie_name.clone(),
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            budget: config.verify_budget,
            client,
        })
    }

    async fn attempt(&self, credential: &SessionCredential, cookie: &HeaderValue) -> Attempt {
        let response = match self
            .client
            .post(&self.endpoint)
            .header(COOKIE, cookie.clone())
            .json(&ValidateSessionRequest {
                session_id: credential.expose(),
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(format!("transport error: {e}")),
        };

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::Retryable(format!("portal returned HTTP {status}"));
        }
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE
        ) {
            return Attempt::Done(VerificationOutcome::Invalid);
        }
        if !status.is_success() {
            return Attempt::Done(VerificationOutcome::Malformed(format!(
                "unexpected HTTP {status} from validation endpoint"
            )));
        }

        match response.bytes().await {
            Ok(body) => Attempt::Done(classify_payload(&body)),
            Err(e) => Attempt::Retryable(format!("failed to read response body: {e}")),
        }
    }
}

#[async_trait]
impl SessionVerifier for PortalVerifier {
    async fn verify(&self, credential: &SessionCredential) -> VerificationOutcome {
        // A credential that cannot travel as a cookie value cannot name a portal session.
        if !is_cookie_safe(credential.expose()) {
            return VerificationOutcome::Invalid;
        }
        let Ok(cookie) =
            HeaderValue::from_str(&format!("{}={}", self.cookie_name, credential.expose()))
        else {
            return VerificationOutcome::Invalid;
        };

        let deadline = Instant::now() + self.budget;
        let mut attempt = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return VerificationOutcome::Unreachable("verification budget exhausted".to_string());
            }
            let attempt_timeout = self.timeout.min(remaining);

            let result = match tokio::time::timeout(attempt_timeout, self.attempt(credential, &cookie)).await {
                Ok(result) => result,
                Err(_) => Attempt::Retryable(format!(
                    "timed out after {} ms",
                    attempt_timeout.as_millis()
                )),
            };

            let reason = match result {
                Attempt::Done(outcome) => {
                    debug!(
                        session = %credential,
                        attempt,
                        outcome = outcome.label(),
                        "Portal answered session lookup"
                    );
                    return outcome;
                }
                Attempt::Retryable(reason) => reason,
            };

            if attempt >= self.max_retries {
                return VerificationOutcome::Unreachable(reason);
            }

            let delay = backoff_delay(self.retry_base_delay, attempt);
            if Instant::now() + delay >= deadline {
                return VerificationOutcome::Unreachable(reason);
            }

            warn!(
                session = %credential,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "Portal lookup failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn mode(&self) -> VerificationMode {
        VerificationMode::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALIDATE_PATH: &str = "/auth/validate-session";

    fn verifier_for(server: &MockServer) -> PortalVerifier {
        let mut config = test_config();
        config.portal_url = server.uri();
        config.timeout = Duration::from_millis(100);
        config.max_retries = 2;
        config.retry_base_delay = Duration::from_millis(1);
        config.verify_budget = Duration::from_secs(2);
        PortalVerifier::new(&config).unwrap()
    }

    fn cred(raw: &str) -> SessionCredential {
        SessionCredential::new(raw).unwrap()
    }

    fn valid_body() -> serde_json::Value {
        json!({
            "valid": true,
            "user_id": 42,
            "email": "a@b.com",
            "name": "Asha Rao",
            "role": "admin",
            "expires_at": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
        })
    }

    #[tokio::test]
    async fn valid_session_yields_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .and(header("cookie", "session_id=sess-123"))
            .and(body_partial_json(json!({"session_id": "sess-123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_body()))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-123")).await;
        let VerificationOutcome::Valid(identity) = outcome else {
            panic!("expected valid outcome, got {outcome:?}");
        };
        assert_eq!(identity.user_id, "42");
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.name.as_deref(), Some("Asha Rao"));
    }

    #[tokio::test]
    async fn explicit_rejection_is_invalid_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-999")).await;
        assert_eq!(outcome, VerificationOutcome::Invalid);
    }

    #[tokio::test]
    async fn credential_that_would_split_the_cookie_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_body()))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server)
            .verify(&cred("sess-123; role=admin"))
            .await;
        assert_eq!(outcome, VerificationOutcome::Invalid);
    }

    #[tokio::test]
    async fn valid_false_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": false})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-999")).await;
        assert_eq!(outcome, VerificationOutcome::Invalid);
    }

    #[tokio::test]
    async fn missing_identity_fields_are_malformed() {
        let server = MockServer::start().await;
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("email");
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-1")).await;
        assert!(matches!(outcome, VerificationOutcome::Malformed(ref r) if r.contains("email")));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-1")).await;
        assert!(matches!(outcome, VerificationOutcome::Malformed(_)));
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-1")).await;
        assert!(matches!(outcome, VerificationOutcome::Unreachable(_)));
    }

    #[tokio::test]
    async fn transient_failure_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_body()))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = verifier_for(&server).verify(&cred("sess-123")).await;
        assert!(matches!(outcome, VerificationOutcome::Valid(_)));
    }

    #[tokio::test]
    async fn portal_timing_out_twice_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(valid_body())
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let mut config = test_config();
        config.portal_url = server.uri();
        config.timeout = Duration::from_millis(50);
        config.max_retries = 1;
        config.retry_base_delay = Duration::from_millis(1);
        let verifier = PortalVerifier::new(&config).unwrap();

        let outcome = verifier.verify(&cred("sess-1")).await;
        assert!(matches!(outcome, VerificationOutcome::Unreachable(ref r) if r.contains("timed out")));
    }

    #[tokio::test]
    async fn retries_stop_at_the_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut config = test_config();
        config.portal_url = server.uri();
        config.timeout = Duration::from_millis(100);
        config.max_retries = 10;
        config.retry_base_delay = Duration::from_millis(1);
        config.verify_budget = Duration::from_millis(250);
        let verifier = PortalVerifier::new(&config).unwrap();

        let started = std::time::Instant::now();
        let outcome = verifier.verify(&cred("sess-1")).await;
        assert!(matches!(outcome, VerificationOutcome::Unreachable(_)));
        assert!(started.elapsed() < Duration::from_millis(450));
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        let mut config = test_config();
        // Port 9 (discard) is not served in the test environment.
        config.portal_url = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_millis(100);
        config.max_retries = 0;
        let verifier = PortalVerifier::new(&config).unwrap();

        let outcome = verifier.verify(&cred("sess-1")).await;
        assert!(matches!(outcome, VerificationOutcome::Unreachable(_)));
    }

    #[test]
    fn payload_accepts_nested_expiry_and_user_type() {
        let expires = (Utc::now() + chrono::Duration::hours(2))
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.f")
            .to_string();
        let body = json!({
            "valid": true,
            "user_id": "u-7",
            "email": "hr@b.com",
            "user_type": "HR",
            "is_system_admin": false,
            "session_data": {"session_id": "s", "expires_at": expires},
        });
        let outcome = classify_payload(body.to_string().as_bytes());
        let VerificationOutcome::Valid(identity) = outcome else {
            panic!("expected valid outcome, got {outcome:?}");
        };
        assert_eq!(identity.role, Role::Hr);
        assert_eq!(identity.user_id, "u-7");
        assert!(identity.name.is_none());
    }

    #[test]
    fn system_admin_flag_grants_admin_role() {
        let mut body = valid_body();
        body["role"] = json!("employee");
        body["is_system_admin"] = json!(true);
        let outcome = classify_payload(body.to_string().as_bytes());
        assert!(matches!(outcome, VerificationOutcome::Valid(ref i) if i.role == Role::Admin));
    }

    #[test]
    fn expired_session_payload_is_invalid() {
        let mut body = valid_body();
        body["expires_at"] = json!((Utc::now() - chrono::Duration::minutes(1)).timestamp());
        assert_eq!(
            classify_payload(body.to_string().as_bytes()),
            VerificationOutcome::Invalid
        );
    }

    #[test]
    fn missing_valid_flag_is_malformed() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("valid");
        assert!(matches!(
            classify_payload(body.to_string().as_bytes()),
            VerificationOutcome::Malformed(_)
        ));
    }

    #[test]
    fn backoff_stays_within_cap() {
        let base = Duration::from_millis(200);
        for attempt in 0..4 {
            let cap = 200 * 2u128.pow(attempt);
            for _ in 0..50 {
                assert!(backoff_delay(base, attempt).as_millis() <= cap);
            }
        }
        assert_eq!(backoff_delay(Duration::ZERO, 3), Duration::ZERO);
    }
}
