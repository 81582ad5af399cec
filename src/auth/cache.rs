// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for successful session verifications.
//!
//! Absorbs portal latency for sessions that make many requests in a short
//! window. Only `Valid` outcomes are ever stored: a rejected or unreachable
//! verification leaves the cache untouched so users are not locked out any
//! longer than the portal outage itself.
//!
//! An entry is served only while it is younger than the TTL *and* the
//! identity's own expiry has not passed.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::credential::SessionCredential;
use super::identity::VerifiedIdentity;

/// Cached entry: verified identity + insertion timestamp.
struct CacheEntry {
    identity: VerifiedIdentity,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl && !self.identity.is_expired()
    }
}

/// In-process LRU cache keyed by credential fingerprint.
pub struct SessionCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl SessionCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of sessions to cache (at least 1).
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Look up a previously verified identity.
    ///
    /// Returns `None` if not cached or expired. A hit refreshes recency.
    pub fn get(&self, credential: &SessionCredential) -> Option<VerifiedIdentity> {
        let key = credential.fingerprint();
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.is_fresh(self.ttl) {
                return Some(entry.identity.clone());
            }
            // Expired — remove it
            cache.pop(&key);
        }
        None
    }

    /// Store a freshly verified identity, replacing any previous entry.
    pub fn put(&self, credential: &SessionCredential, identity: VerifiedIdentity) {
        let key = credential.fingerprint();
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    identity,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the entry for a credential.
    pub fn invalidate(&self, credential: &SessionCredential) {
        let key = credential.fingerprint();
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&key);
        }
    }

    /// Number of stored entries, expired ones included until they are purged.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut cache) = self.cache.lock() else {
            return 0;
        };
        let stale: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        stale.len()
    }
}

/// Background task that periodically purges expired cache entries.
pub struct CacheSweeper {
    cache: std::sync::Arc<SessionCache>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: std::sync::Arc<SessionCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session cache sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session cache sweeper shutting down");
                    return;
                }
            }

            let removed = self.cache.purge_expired();
            if removed > 0 {
                debug!(removed, remaining = self.cache.len(), "Purged expired sessions");
            }
        }
    }
}
