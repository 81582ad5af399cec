// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles the portal assigns to HR-application users.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access, including role management and audit logs
/// - `Hr` - HR staff; everything a recruiter can do plus employee records
/// - `Recruiter` - Talent acquisition: jobs and candidates
/// - `Interviewer` - Candidates assigned for interview
/// - `Employee` - Self-service only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    Recruiter,
    Interviewer,
    /// Least privilege; assigned when the portal sends a role we do not know.
    #[default]
    Employee,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::Hr, Role::Hr | Role::Recruiter | Role::Employee) => true,
            (Role::Recruiter, Role::Recruiter | Role::Employee) => true,
            (Role::Interviewer, Role::Interviewer | Role::Employee) => true,
            (Role::Employee, Role::Employee) => true,
            _ => false,
        }
    }

    /// Parse a portal role name (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "system-admin" | "system_admin" | "sysadmin" => Some(Role::Admin),
            "hr" | "hr-manager" | "hr_manager" => Some(Role::Hr),
            "recruiter" | "ta" | "ta-team" => Some(Role::Recruiter),
            "interviewer" => Some(Role::Interviewer),
            "employee" | "user" => Some(Role::Employee),
            _ => None,
        }
    }

    /// Parse a portal role name, falling back to [`Role::Employee`].
    pub fn parse_or_default(s: &str) -> Role {
        Role::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Hr => write!(f, "hr"),
            Role::Recruiter => write!(f, "recruiter"),
            Role::Interviewer => write!(f, "interviewer"),
            Role::Employee => write!(f, "employee"),
        }
    }
}
