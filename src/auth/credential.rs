// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session credential extraction.
//!
//! Pulls the portal session identifier out of an inbound request. Extraction
//! is purely syntactic: nothing here knows whether the credential is valid.
//!
//! Lookup order:
//! 1. the session cookie (`SESSION_COOKIE_NAME`, default `session_id`)
//! 2. the session header (`SESSION_HEADER_NAME`, default `x-session-id`)
//! 3. the `session_id` query parameter, only when `SESSION_QUERY_FALLBACK` is on

use std::fmt;

use axum::http::{header::COOKIE, HeaderMap, Uri};
use cookie::Cookie;
use sha2::{Digest, Sha256};

use crate::config::VerificationConfig;

/// Query parameter consulted by the optional fallback.
pub const SESSION_QUERY_PARAM: &str = "session_id";

/// An untrusted session identifier taken from a request.
///
/// `Debug` and `Display` print a fingerprint, never the raw value, so the
/// credential can be logged safely.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Wrap a raw value; returns `None` for blank input.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw credential, for forwarding to the portal.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the credential.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(self.0.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Short fingerprint prefix for log lines.
    pub fn short_fingerprint(&self) -> String {
        let mut fp = self.fingerprint();
        fp.truncate(12);
        fp
    }
}

/// Cookie-octet check (RFC 6265): no whitespace, quotes, commas, semicolons
/// or backslashes.
pub fn is_cookie_safe(value: &str) -> bool {
    value
        .bytes()
        .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'))
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionCredential({})", self.short_fingerprint())
    }
}

impl fmt::Display for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_fingerprint())
    }
}

/// Extract the session credential from request headers and URI.
pub fn extract(
    headers: &HeaderMap,
    uri: &Uri,
    config: &VerificationConfig,
) -> Option<SessionCredential> {
    from_cookie(headers, &config.cookie_name)
        .or_else(|| from_header(headers, &config.header_name))
        .or_else(|| {
            if config.query_fallback {
                from_query(uri)
            } else {
                None
            }
        })
}

fn from_cookie(headers: &HeaderMap, name: &str) -> Option<SessionCredential> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value.to_string()))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .and_then(|cookie| SessionCredential::new(cookie.value()))
}

fn from_header(headers: &HeaderMap, name: &str) -> Option<SessionCredential> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(SessionCredential::new)
}

fn from_query(uri: &Uri) -> Option<SessionCredential> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == SESSION_QUERY_PARAM)
        .and_then(|(_, value)| {
            // Some clients double-encode as `session_id=session_id=<value>`.
            let value = value
                .split_once('=')
                .map(|(_, inner)| inner.to_string())
                .unwrap_or_else(|| value.to_string());
            SessionCredential::new(value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn reads_designated_cookie() {
        let config = test_config();
        let h = headers(&[("cookie", "theme=dark; session_id=sess-123; lang=en")]);
        let cred = extract(&h, &uri("/jobs"), &config).unwrap();
        assert_eq!(cred.expose(), "sess-123");
    }

    #[test]
    fn reads_cookie_across_multiple_headers() {
        let config = test_config();
        let h = headers(&[("cookie", "theme=dark"), ("cookie", "session_id=sess-9")]);
        assert_eq!(extract(&h, &uri("/"), &config).unwrap().expose(), "sess-9");
    }

    #[test]
    fn falls_back_to_header() {
        let config = test_config();
        let h = headers(&[("x-session-id", "  sess-from-header ")]);
        assert_eq!(
            extract(&h, &uri("/"), &config).unwrap().expose(),
            "sess-from-header"
        );
    }

    #[test]
    fn cookie_wins_over_header() {
        let config = test_config();
        let h = headers(&[("cookie", "session_id=from-cookie"), ("x-session-id", "from-header")]);
        assert_eq!(extract(&h, &uri("/"), &config).unwrap().expose(), "from-cookie");
    }

    #[test]
    fn empty_values_are_absent() {
        let config = test_config();
        let h = headers(&[("cookie", "session_id="), ("x-session-id", "   ")]);
        assert!(extract(&h, &uri("/"), &config).is_none());
        assert!(extract(&HeaderMap::new(), &uri("/"), &config).is_none());
    }

    #[test]
    fn query_is_ignored_unless_enabled() {
        let mut config = test_config();
        let target = uri("/jobs?session_id=sess-q");
        assert!(extract(&HeaderMap::new(), &target, &config).is_none());

        config.query_fallback = true;
        assert_eq!(
            extract(&HeaderMap::new(), &target, &config).unwrap().expose(),
            "sess-q"
        );
    }

    #[test]
    fn query_fallback_unwraps_double_encoding() {
        let mut config = test_config();
        config.query_fallback = true;
        let target = uri("/jobs?session_id=session_id%3Dsess-q");
        assert_eq!(
            extract(&HeaderMap::new(), &target, &config).unwrap().expose(),
            "sess-q"
        );
    }

    #[test]
    fn cookie_safety() {
        assert!(is_cookie_safe("sess-123"));
        assert!(is_cookie_safe("eyJhbGciOi.eyJzdWIi.sig_-"));
        assert!(!is_cookie_safe("a b"));
        assert!(!is_cookie_safe("a;b"));
        assert!(!is_cookie_safe("\"quoted\""));
    }

    #[test]
    fn debug_never_shows_raw_value() {
        let cred = SessionCredential::new("super-secret-session").unwrap();
        let rendered = format!("{cred:?} {cred}");
        assert!(!rendered.contains("super-secret-session"));
        assert_eq!(cred.fingerprint().len(), 64);
        assert_eq!(cred.short_fingerprint().len(), 12);
    }
}
