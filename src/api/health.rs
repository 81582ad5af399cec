// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::StatsSnapshot;
use crate::state::AppState;

/// Health check response with gateway status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Verification mode (`remote` or `stateless`).
    pub auth_mode: String,
    /// Portal base URL sessions are verified against.
    pub portal: String,
    /// Live entries in the validation cache.
    pub cached_sessions: usize,
    /// Gateway counters since startup.
    pub gateway: StatsSnapshot,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// The portal is not probed here; a portal outage shows up as a rising
/// `portal_unreachable` counter while this endpoint stays green, since cached
/// sessions keep working.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let gateway = &state.gateway;
    let response = ReadyResponse {
        status: "ok".to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            auth_mode: gateway.mode().to_string(),
            portal: state.config.portal_url.clone(),
            cached_sessions: gateway.cache().len(),
            gateway: gateway.stats(),
        },
    };

    (StatusCode::OK, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Configuration was validated before the listener was bound, so a running
/// process is ready to serve.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
