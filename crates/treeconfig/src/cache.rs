//! TTL-keyed cache of resolution outcomes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::error::ResolveError;
use crate::request::ResolutionRequest;

/// Outcome stored per cache entry: the merged document or the fatal error
/// the resolution ended with.
pub type CachedOutcome = Result<String, ResolveError>;

/// Composite key assumed to fully determine the discoverable config set
/// for the TTL window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    slug: String,
    ref_name: String,
    before: String,
    after: String,
    event: String,
    trigger: String,
    author: String,
}

impl CacheKey {
    pub fn for_request(req: &ResolutionRequest) -> Self {
        CacheKey {
            slug: req.repo.slug.clone(),
            ref_name: req.ref_name.clone(),
            before: req.before.clone(),
            after: req.after.clone(),
            event: req.event.clone(),
            trigger: req.trigger.clone(),
            author: req.author.clone(),
        }
    }
}

struct CacheEntry {
    outcome: CachedOutcome,
    /// Stamp distinguishing this entry from an older one under the same
    /// key, so a stale expiry timer never removes a newer entry.
    generation: u64,
}

/// In-memory result cache with per-entry TTL eviction.
///
/// Internally synchronized; `get`/`put`/`invalidate` may be called from
/// concurrent tasks. There is no size bound and no deduplication of
/// concurrent identical in-flight resolutions (documented limitations).
#[derive(Default)]
pub struct ResultCache {
    entries: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    generation: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for `key`, if present and not yet expired.
    pub fn get(&self, key: &CacheKey) -> Option<CachedOutcome> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| entry.outcome.clone())
    }

    /// Store an outcome and schedule its removal after `ttl`.
    ///
    /// A zero `ttl` disables caching: nothing is stored. Re-putting a live
    /// key replaces the entry under a fresh generation; the superseded
    /// timer finds the generation mismatch when it fires and leaves the
    /// newer entry alone.
    pub fn put(&self, key: CacheKey, outcome: CachedOutcome, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(key.clone(), CacheEntry { outcome, generation });
        }
        debug!(key = ?key, "config-cache added entry");

        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut entries = entries.lock().unwrap();
            let expired = entries
                .get(&key)
                .is_some_and(|entry| entry.generation == generation);
            if expired {
                entries.remove(&key);
                debug!(key = ?key, "config-cache expired entry");
            }
        });
    }

    /// Remove an entry immediately. Any pending expiry timer for it
    /// becomes a no-op.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
