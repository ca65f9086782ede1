//! Decision cache: memoizes `(subject, policy)` evaluations.
//!
//! An explicit, constructed component — callers build one with
//! [`DecisionCache::new`] and inject it where needed; there is no global
//! cache state. Entries are bounded two ways: a TTL (a subject's KYC,
//! employment, or role state can change between requests, so a stale
//! decision must age out quickly) and a capacity cap with oldest-entry
//! eviction. Attribute-mutation events can also invalidate a subject's
//! entries eagerly via [`DecisionCache::invalidate_subject`].

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

use lyceum_types::{SchoolId, UserId};

use crate::evaluator::ValidationResult;
use crate::policy::AccessPolicy;

/// A cached decision with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry {
    result: ValidationResult,
    inserted_at: Instant,
}

/// Concurrency-safe, TTL- and capacity-bounded decision cache.
///
/// Reads and writes to the same key from concurrent requests are safe; a
/// reader never observes a partially-written entry (all access goes
/// through the lock).
#[derive(Debug)]
pub struct DecisionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl DecisionCache {
    /// Creates a cache with the given entry TTL and capacity bound.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        assert!(capacity > 0, "decision cache capacity must be non-zero");
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Builds the deterministic cache key for a `(subject, policy)` pair.
    ///
    /// The key composes the subject id, resource, action, role-matching
    /// strategy, the request's current-school context, and the serialized
    /// conditions, so two evaluations that can differ in outcome never
    /// share an entry.
    pub fn cache_key(
        user_id: &UserId,
        policy: &AccessPolicy,
        current_school: Option<&SchoolId>,
    ) -> String {
        let conditions = serde_json::to_string(&policy.conditions)
            .unwrap_or_else(|_| format!("{:?}", policy.conditions));
        format!(
            "{}|{}|{}|{}|{}|{}",
            user_id,
            policy.resource,
            policy.action,
            policy.role_matching.as_str(),
            current_school.map_or("-", SchoolId::as_str),
            conditions
        )
    }

    /// Returns the cached decision for `key`, if present and fresh.
    pub fn get(&self, key: &str) -> Option<ValidationResult> {
        let Ok(entries) = self.entries.read() else {
            return None;
        };
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            debug!(key, "decision cache entry expired");
            return None;
        }
        debug!(key, "decision cache hit");
        Some(entry.result.clone())
    }

    /// Stores a decision under `key`.
    ///
    /// At capacity, expired entries are swept first; if the cache is still
    /// full, the oldest entry is evicted.
    pub fn put(&self, key: impl Into<String>, result: ValidationResult) {
        let key = key.into();
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!(key = %oldest, "decision cache evicting oldest entry");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops every cached decision for one subject.
    ///
    /// Called on attribute-mutation events (KYC completion, role grants) so
    /// the next request re-evaluates against fresh attributes.
    pub fn invalidate_subject(&self, user_id: &UserId) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        let prefix = format!("{user_id}|");
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        debug!(
            subject = %user_id,
            dropped = before - entries.len(),
            "decision cache invalidated subject"
        );
    }

    /// Removes every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Returns the number of entries, including any not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
