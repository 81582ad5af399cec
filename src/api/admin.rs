// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints for gateway operations.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::{AdminOnly, StatsSnapshot},
    state::AppState,
};

/// Gateway status response.
#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayStatusResponse {
    /// Verification mode (`remote` or `stateless`).
    pub auth_mode: String,
    /// Portal base URL.
    pub portal: String,
    /// Live entries in the validation cache.
    pub cached_sessions: usize,
    /// Cache capacity.
    pub cache_capacity: usize,
    /// Cache TTL in seconds.
    pub cache_ttl_secs: u64,
    /// Counters since startup.
    pub stats: StatsSnapshot,
}

/// Cache purge response.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurgeResponse {
    /// Number of stale entries removed.
    pub purged: usize,
    /// Entries left afterwards.
    pub remaining: usize,
}

/// Get gateway status and counters.
#[utoipa::path(
    get,
    path = "/v1/admin/gateway",
    tag = "Admin",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Gateway status", body = GatewayStatusResponse),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn gateway_status(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Json<GatewayStatusResponse> {
    let gateway = &state.gateway;
    Json(GatewayStatusResponse {
        auth_mode: gateway.mode().to_string(),
        portal: state.config.portal_url.clone(),
        cached_sessions: gateway.cache().len(),
        cache_capacity: state.config.cache_capacity,
        cache_ttl_secs: state.config.cache_ttl.as_secs(),
        stats: gateway.stats(),
    })
}

/// Remove stale entries from the validation cache now.
#[utoipa::path(
    post,
    path = "/v1/admin/cache/purge",
    tag = "Admin",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Purge result", body = PurgeResponse),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn purge_cache(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
) -> Json<PurgeResponse> {
    let cache = state.gateway.cache();
    let purged = cache.purge_expired();
    info!(user_id = %admin.user_id, purged, "validation cache purged");
    Json(PurgeResponse {
        purged,
        remaining: cache.len(),
    })
}
