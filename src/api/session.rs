// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal hand-off endpoints.
//!
//! After login the portal sends the browser to `/auth/callback` with the new
//! session identifier. The callback stores it in the session cookie and
//! forwards to the page the user originally asked for. Only same-origin
//! targets are honored; anything else lands on `/`.

use axum::{
    extract::{Query, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use tracing::info;
use url::Url;
use utoipa::IntoParams;

use crate::{
    auth::{credential, gateway::request_origin, CurrentUser, SessionCredential},
    config::VerificationConfig,
    error::ApiError,
    state::AppState,
};

/// Query parameters the portal appends to the callback URL.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// Session identifier issued by the portal.
    pub session_id: Option<String>,
    /// Where to send the user afterwards.
    pub return_to: Option<String>,
}

/// Store the portal session and continue to the original page.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Session",
    params(CallbackParams),
    responses(
        (status = 303, description = "Session cookie set, redirecting to return_to"),
        (status = 400, description = "Missing or unusable session_id"),
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let credential = params
        .session_id
        .as_deref()
        .and_then(SessionCredential::new)
        .ok_or_else(|| ApiError::bad_request("session_id is required"))?;
    if !credential::is_cookie_safe(credential.expose()) {
        return Err(ApiError::bad_request("session_id contains invalid characters"));
    }

    let origin = request_origin(&headers, state.config.deployment);
    let target = safe_return_to(params.return_to.as_deref(), origin);
    let cookie = session_cookie(&state.config, credential.expose());

    info!(session = %credential, target = %target, "portal session accepted");

    Ok((
        StatusCode::SEE_OTHER,
        [(LOCATION, target), (SET_COOKIE, cookie.to_string())],
    )
        .into_response())
}

/// Sign out of this application.
///
/// Drops the cached verification and clears the session cookie. The portal
/// session itself is left alone.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Session",
    responses(
        (status = 204, description = "Signed out"),
        (status = 307, description = "No valid session; redirect to portal login"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if let Some(credential) = credential::extract(&headers, &uri, &state.config) {
        state.gateway.revoke(&credential, &user.user_id);
    }
    info!(user_id = %user.user_id, "signed out");

    let mut removal = base_cookie(&state.config, String::new());
    removal.make_removal();
    (StatusCode::NO_CONTENT, [(SET_COOKIE, removal.to_string())]).into_response()
}

fn base_cookie(config: &VerificationConfig, value: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .build()
}

fn session_cookie(config: &VerificationConfig, value: &str) -> Cookie<'static> {
    base_cookie(config, value.to_string())
}

/// Reduce `return_to` to a same-origin path.
///
/// `origin` is the `(scheme, host)` the client used; absolute targets must
/// match it in scheme, host and port.
fn safe_return_to(return_to: Option<&str>, origin: Option<(&str, &str)>) -> String {
    let Some(raw) = return_to.map(str::trim).filter(|r| !r.is_empty()) else {
        return "/".to_string();
    };

    if raw.starts_with('/') {
        if raw.starts_with("//") || raw.contains('\\') {
            return "/".to_string();
        }
        return raw.to_string();
    }

    // The gateway sends absolute URLs; accept them when they point back here.
    let (Ok(target), Some((scheme, host))) = (Url::parse(raw), origin) else {
        return "/".to_string();
    };
    let same_origin = matches!(target.scheme(), "http" | "https")
        && Url::parse(&format!("{scheme}://{host}/"))
            .is_ok_and(|here| here.origin() == target.origin());
    if !same_origin {
        return "/".to_string();
    }

    match target.query() {
        Some(query) => format!("{}?{query}", target.path()),
        None => target.path().to_string(),
    }
}
