//! DashMap Lookup Cache
//!
//! Implements LookupCache using DashMap for lock-free concurrent access.

use crate::domain::entities::LookupResult;
use crate::domain::ports::LookupCache;
use crate::domain::value_objects::CountryCode;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

struct CacheEntry {
    result: Arc<LookupResult>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// DashMap-backed lookup cache.
///
/// Entries are immutable `Arc<LookupResult>`s swapped in whole by `put`.
/// Size is capped at `capacity`: when full, expired entries go first, then
/// the oldest lookups. The GC task, if started, is aborted on drop.
pub struct DashMapLookupCache {
    entries: Arc<DashMap<IpAddr, CacheEntry>>,
    capacity: usize,
    gc_task: Option<JoinHandle<()>>,
}

impl DashMapLookupCache {
    /// Create a new cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            gc_task: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start the background garbage collection task.
    ///
    /// Removes entries whose TTL has elapsed. Replaces any task started
    /// earlier; the task stops when the cache is dropped.
    pub fn start_gc(&mut self, interval: Duration) {
        let entries = self.entries.clone();

        if let Some(previous) = self.gc_task.take() {
            previous.abort();
        }

        self.gc_task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let removed = Self::purge_expired(&entries, Instant::now());
                if removed > 0 {
                    tracing::debug!("lookup cache GC removed {} expired entries", removed);
                }
            }
        }));
    }

    /// Remove all expired entries now.
    pub fn cleanup_expired(&self) -> usize {
        Self::purge_expired(&self.entries, Instant::now())
    }

    fn purge_expired(entries: &DashMap<IpAddr, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(entries.len())
    }

    /// Make room for one more entry.
    fn evict_for_insert(&self, incoming: &IpAddr) {
        if self.entries.len() < self.capacity || self.entries.contains_key(incoming) {
            return;
        }

        if Self::purge_expired(&self.entries, Instant::now()) > 0
            && self.entries.len() < self.capacity
        {
            return;
        }

        let excess = self.entries.len() + 1 - self.capacity;
        let mut by_age: Vec<(IpAddr, Instant)> = self
            .entries
            .iter()
            .map(|e| (*e.key(), e.value().result.fetched_at))
            .collect();
        by_age.sort_by_key(|(_, fetched_at)| *fetched_at);

        for (ip, _) in by_age.into_iter().take(excess) {
            self.entries.remove(&ip);
        }
        tracing::debug!("lookup cache full, evicted {} oldest entries", excess);
    }
}

impl Drop for DashMapLookupCache {
    fn drop(&mut self) {
        if let Some(task) = self.gc_task.take() {
            task.abort();
        }
    }
}

impl LookupCache for DashMapLookupCache {
    fn get(&self, ip: &IpAddr) -> Option<CountryCode> {
        self.entry(ip).and_then(|result| result.country.clone())
    }

    fn put(&self, ip: IpAddr, country: CountryCode, ttl: Duration) {
        self.evict_for_insert(&ip);

        let result = LookupResult::resolved(ip, country);
        let expires_at = result.fetched_at + ttl;
        self.entries.insert(
            ip,
            CacheEntry {
                result: Arc::new(result),
                expires_at,
            },
        );
    }

    fn entry(&self, ip: &IpAddr) -> Option<Arc<LookupResult>> {
        let now = Instant::now();
        let hit = self.entries.get(ip).and_then(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.result.clone())
            }
        });

        if hit.is_none() {
            // Drop a stale entry eagerly; the guard above is released by now.
            self.entries.remove_if(ip, |_, entry| entry.is_expired(now));
        }
        hit
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
