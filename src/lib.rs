// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal Session Gateway - Cross-Application Session Authentication
//!
//! This crate sits in front of the HR application's backend and decides, for
//! every request, whether the caller holds a valid session issued by the
//! central authentication portal. Verified callers reach the handlers with
//! their identity attached; everyone else is sent to the portal login page.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `audit` - Audit trail for authentication decisions
//! - `auth` - Session gateway, verifiers, cache and extractors
//! - `config` - Environment configuration

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
