//! Registry of service URLs trusted as reply targets.
//!
//! A service URL is only trusted once an activity naming it has passed the
//! authentication gate. Entries expire so that a channel which stops
//! talking to the bot eventually stops being a valid reply target.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Default lifetime of a trusted service URL (24 hours).
pub const DEFAULT_TRUST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Expired entries are swept on every this-many registrations.
const PURGE_INTERVAL: usize = 64;

/// Concurrent set of trusted service URLs with per-entry expiry.
#[derive(Debug)]
pub struct TrustedServiceUrls {
    // `None` expiry means the entry never expires.
    entries: RwLock<HashMap<String, Option<Instant>>>,
    ttl: Duration,
    inserts: AtomicUsize,
}

impl TrustedServiceUrls {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TRUST_TTL)
    }

    /// Registry whose entries expire `ttl` after their last registration.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            inserts: AtomicUsize::new(0),
        }
    }

    /// Trust `url` for the configured lifetime.
    ///
    /// Returns `true` if the URL was not trusted before. Registering a URL
    /// that is already present only refreshes its expiry.
    pub fn trust(&self, url: &str) -> bool {
        self.insert(url, Instant::now().checked_add(self.ttl))
    }

    /// Trust `url` until the given instant.
    pub fn trust_until(&self, url: &str, expires_at: Instant) -> bool {
        self.insert(url, Some(expires_at))
    }

    fn insert(&self, url: &str, expires_at: Option<Instant>) -> bool {
        let Some(key) = normalize(url) else {
            return false;
        };
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            entries.retain(|_, expiry| is_live(*expiry, now));
        }
        let was_trusted = entries
            .get(&key)
            .is_some_and(|expiry| is_live(*expiry, now));
        entries.insert(key, expires_at);
        !was_trusted
    }

    /// Whether `url` is currently trusted.
    pub fn is_trusted(&self, url: &str) -> bool {
        let Some(key) = normalize(url) else {
            return false;
        };
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&key)
            .is_some_and(|expiry| is_live(*expiry, Instant::now()))
    }

    /// Drop expired entries. Returns how many were removed.
    ///
    /// Registration also sweeps periodically, so calling this is only
    /// needed to reclaim memory eagerly.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, expiry| is_live(*expiry, now));
        before - entries.len()
    }

    /// Number of entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently trusted URLs, sorted.
    pub fn urls(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut urls: Vec<String> = entries
            .iter()
            .filter(|(_, expiry)| is_live(**expiry, now))
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }
}

impl Default for TrustedServiceUrls {
    fn default() -> Self {
        Self::new()
    }
}

fn is_live(expiry: Option<Instant>, now: Instant) -> bool {
    expiry.is_none_or(|at| at > now)
}

fn normalize(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    (!url.is_empty()).then(|| url.to_string())
}
