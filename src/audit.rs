// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for authentication decisions.
//!
//! The gateway reports fresh verifications, rejections, malformed portal
//! payloads and portal outages through an [`AuditSink`]. The HR application's
//! own audit-log store plugs in behind that trait; the default
//! [`TracingAuditSink`] emits structured `tracing` events on target `audit`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Session events
    SessionVerified,
    SessionRejected,
    SessionMalformed,
    SessionRevoked,

    // Portal events
    PortalUnreachable,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::SessionVerified => "session_verified",
            AuditEventType::SessionRejected => "session_rejected",
            AuditEventType::SessionMalformed => "session_malformed",
            AuditEventType::SessionRevoked => "session_revoked",
            AuditEventType::PortalUnreachable => "portal_unreachable",
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User the session belongs to (if known).
    pub user_id: Option<String>,
    /// Fingerprint of the session credential, never the raw value.
    pub session: Option<String>,
    /// Request path that triggered the event.
    pub path: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the request was let through.
    pub success: bool,
    /// Failure reason.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            session: None,
            path: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session(mut self, fingerprint: impl Into<String>) -> Self {
        self.session = Some(fingerprint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Destination for audit events.
///
/// `record` is called on the request path and must not block.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes audit events as structured tracing events on target `audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let details = event
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();

        if event.success {
            tracing::info!(
                target: "audit",
                event_id = %event.event_id,
                event_type = event.event_type.as_str(),
                user_id = event.user_id.as_deref().unwrap_or(""),
                session = event.session.as_deref().unwrap_or(""),
                path = event.path.as_deref().unwrap_or(""),
                details = %details,
                "audit event"
            );
        } else {
            tracing::warn!(
                target: "audit",
                event_id = %event.event_id,
                event_type = event.event_type.as_str(),
                user_id = event.user_id.as_deref().unwrap_or(""),
                session = event.session.as_deref().unwrap_or(""),
                path = event.path.as_deref().unwrap_or(""),
                details = %details,
                error = event.error.as_deref().unwrap_or(""),
                "audit event"
            );
        }
    }
}
