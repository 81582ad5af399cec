// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public/protected route classification.
//!
//! Everything is protected unless a rule says otherwise. A fixed core of
//! paths (health probes, the login callback) is public no matter what the
//! table contains, so the gateway stays diagnosable during a portal outage.

/// Paths that are always public.
pub const ALWAYS_PUBLIC: &[&str] = &["/health", "/health/live", "/health/ready", "/auth/callback"];

/// Default public table of the HR application.
///
/// Rules ending in `*` or `/` are prefix rules; anything else is exact.
pub const DEFAULT_PUBLIC_RULES: &[&str] = &["/", "/docs*", "/api-doc*", "/public/"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Exact(String),
    Prefix(String),
}

impl Rule {
    fn parse(raw: &str) -> Self {
        if let Some(prefix) = raw.strip_suffix('*') {
            Rule::Prefix(prefix.to_string())
        } else if raw.len() > 1 && raw.ends_with('/') {
            Rule::Prefix(raw.to_string())
        } else {
            Rule::Exact(raw.to_string())
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Rule::Exact(exact) => path == exact,
            // `/docs*` matches `/docs` and `/docs/...` but not `/docsx`
            Rule::Prefix(prefix) if prefix.ends_with('/') => path.starts_with(prefix.as_str()),
            Rule::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Static table deciding which routes need an authenticated session.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    rules: Vec<Rule>,
}

impl RouteClassifier {
    /// Build a classifier from public rules.
    pub fn new<I, S>(public_rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = ALWAYS_PUBLIC
            .iter()
            .map(|p| Rule::Exact((*p).to_string()))
            .chain(public_rules.into_iter().map(|r| Rule::parse(r.as_ref().trim())))
            .collect();
        Self { rules }
    }

    /// The HR application's default table plus extra rules.
    pub fn with_defaults<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra: Vec<String> = extra.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::new(
            DEFAULT_PUBLIC_RULES
                .iter()
                .map(|s| s.to_string())
                .chain(extra),
        )
    }

    /// Whether a request to `path` must carry a verified session.
    pub fn requires_auth(&self, path: &str) -> bool {
        !self.rules.iter().any(|rule| rule.matches(path))
    }
}
