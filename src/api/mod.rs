// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    audit::{AuditEvent, AuditEventType},
    auth::{session_gateway, Role, StatsSnapshot, VerifiedIdentity},
    state::AppState,
};

pub mod admin;
pub mod health;
pub mod session;
pub mod users;

pub fn router(state: AppState) -> Router {
    let gateway = state.gateway.clone();
    let request_timeout = state.config.request_timeout;

    let v1_routes = Router::new()
        .route("/users/me", get(users::get_current_user))
        .route("/admin/gateway", get(admin::gateway_status))
        .route("/admin/cache/purge", post(admin::purge_cache));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/auth/callback", get(session::callback))
        .route("/auth/logout", post(session::logout))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(gateway, session_gateway))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("session_id"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        session::callback,
        session::logout,
        users::get_current_user,
        admin::gateway_status,
        admin::purge_cache
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            users::UserMeResponse,
            admin::GatewayStatusResponse,
            admin::PurgeResponse,
            StatsSnapshot,
            VerifiedIdentity,
            Role,
            AuditEvent,
            AuditEventType
        )
    ),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Session", description = "Portal session hand-off"),
        (name = "Users", description = "Current user"),
        (name = "Admin", description = "Gateway operations")
    )
)]
struct ApiDoc;
