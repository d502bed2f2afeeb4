// ── Query cache registry ──
//
// Process-wide single source of truth per ResourceKey. One registry
// per application session, passed by Arc injection rather than ambient
// global state so tests can run isolated instances.
//
// Concurrency: slot state is guarded by a std Mutex that is never held
// across an await; at most one fetch is in flight per key, enforced by
// storing a Shared future under that lock.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::debug;

use super::entry::{EntrySlot, ErrorInfo, QueryStatus, StoredValue};
use crate::cache::EntrySnapshot;
use crate::error::SyncError;
use crate::key::ResourceKey;

/// Registry of cache entries, keyed by [`ResourceKey`].
pub struct QueryRegistry {
    entries: DashMap<ResourceKey, Arc<EntrySlot>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live entries (all statuses).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&self, key: &ResourceKey) -> Arc<EntrySlot> {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(EntrySlot::new()))
            .clone()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Return the cached value if fresh; otherwise fetch (or join the
    /// in-flight fetch) and return the result.
    ///
    /// Guarantees:
    /// - a fresh Success entry is served without any fetcher call;
    /// - concurrent callers for the same key trigger exactly one
    ///   fetcher call and all receive its result;
    /// - a failed fetch records Error but keeps the previous value.
    pub async fn ensure_fresh<T, F, Fut>(
        &self,
        key: &ResourceKey,
        stale_after: Duration,
        fetcher: F,
    ) -> Result<Arc<T>, SyncError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, larder_api::Error>> + Send + 'static,
    {
        let slot = self.slot(key);

        let in_flight = {
            let mut state = slot.state.lock().expect("entry lock poisoned");

            if state.status == QueryStatus::Success && !state.is_stale(stale_after) {
                if let Some(ref stored) = state.value {
                    return downcast::<T>(stored.clone());
                }
            }

            if let Some(ref pending) = state.in_flight {
                pending.clone()
            } else {
                debug!(%key, "cache miss or stale; fetching");
                state.status = QueryStatus::Loading;
                let started_under = state.invalidations;

                let pending = fetcher();
                let applied_to = Arc::clone(&slot);
                let fut: BoxFuture<'static, Result<StoredValue, ErrorInfo>> =
                    Box::pin(async move {
                        let result = pending.await;
                        let mut state = applied_to.state.lock().expect("entry lock poisoned");
                        let outcome = match result {
                            Ok(value) => {
                                let stored: StoredValue = Arc::new(value);
                                state.value = Some(stored.clone());
                                state.status = QueryStatus::Success;
                                state.error = None;
                                // An invalidation that landed mid-flight must
                                // survive this fetch: the result may predate
                                // the write that triggered it, so the entry
                                // stays stale and the next read revalidates.
                                state.last_fetched_at = if state.invalidations == started_under {
                                    Some(Utc::now())
                                } else {
                                    None
                                };
                                Ok(stored)
                            }
                            Err(err) => {
                                // Keep the previous value: consumers may
                                // show last-known-good data alongside an
                                // error indicator.
                                let info = ErrorInfo::from_api(&err);
                                state.status = QueryStatus::Error;
                                state.error = Some(info.clone());
                                Err(info)
                            }
                        };
                        state.in_flight = None;
                        drop(state);
                        applied_to.notify();
                        outcome
                    });

                let shared = fut.shared();
                state.in_flight = Some(shared.clone());
                drop(state);
                slot.notify();
                shared
            }
        };

        let stored = in_flight.await.map_err(SyncError::from_info)?;
        downcast::<T>(stored)
    }

    /// Typed read of an entry's current state. Does not create entries;
    /// an unknown key reads as Idle.
    pub fn snapshot<T: Send + Sync + 'static>(&self, key: &ResourceKey) -> EntrySnapshot<T> {
        let Some(slot) = self.entries.get(key).map(|e| Arc::clone(e.value())) else {
            return EntrySnapshot::idle();
        };
        let state = slot.state.lock().expect("entry lock poisoned");
        EntrySnapshot {
            value: state
                .value
                .clone()
                .and_then(|stored| stored.downcast::<T>().ok()),
            status: state.status,
            error: state.error.clone(),
            last_fetched_at: state.last_fetched_at,
        }
    }

    /// Subscribe to change notifications for one key, creating the
    /// entry (Idle) if it does not exist yet.
    pub fn subscribe(&self, key: &ResourceKey) -> watch::Receiver<u64> {
        self.slot(key).subscribe()
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every entry matching the predicate stale by clearing its
    /// fetch timestamp. Values are retained — consumers keep showing
    /// last-known data while the next read revalidates.
    pub fn invalidate<P: Fn(&ResourceKey) -> bool>(&self, predicate: P) {
        for entry in self.entries.iter() {
            if predicate(entry.key()) {
                let slot = entry.value();
                let mut state = slot.state.lock().expect("entry lock poisoned");
                state.invalidations += 1;
                if state.last_fetched_at.take().is_some() || state.in_flight.is_some() {
                    drop(state);
                    slot.notify();
                }
            }
        }
    }

    /// Conservative default: invalidate every entry of one kind,
    /// whatever its params (collections and entity keys alike).
    pub fn invalidate_kind(&self, kind: crate::key::ResourceKind) {
        debug!(%kind, "invalidating all entries of kind");
        self.invalidate(|key| key.kind == kind);
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Record a live reference to a key, creating the entry if needed.
    /// Dropping the guard releases the reference.
    pub fn retain(&self, key: &ResourceKey) -> RetainGuard {
        let slot = self.slot(key);
        {
            let mut state = slot.state.lock().expect("entry lock poisoned");
            state.refs += 1;
            state.released_at = None;
        }
        RetainGuard { slot }
    }

    /// Drop entries that have had no live references for longer than
    /// the grace period. An optimization, not a correctness requirement.
    pub fn sweep(&self, grace: Duration) {
        let now = Utc::now();
        self.entries.retain(|_, slot| {
            let state = slot.state.lock().expect("entry lock poisoned");
            let expired = state.refs == 0
                && state
                    .released_at
                    .is_some_and(|t: DateTime<Utc>| now - t > grace);
            !expired
        });
    }

    /// Session teardown (logout / reset): drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference-count guard returned by [`QueryRegistry::retain`].
pub struct RetainGuard {
    slot: Arc<EntrySlot>,
}

impl Drop for RetainGuard {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock().expect("entry lock poisoned");
        state.refs = state.refs.saturating_sub(1);
        if state.refs == 0 {
            state.released_at = Some(Utc::now());
        }
    }
}

fn downcast<T: Send + Sync + 'static>(stored: StoredValue) -> Result<Arc<T>, SyncError> {
    stored
        .downcast::<T>()
        .map_err(|_| SyncError::Internal("cache entry type mismatch".into()))
}
