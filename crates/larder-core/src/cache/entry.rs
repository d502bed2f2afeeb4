// ── Cache entry state ──
//
// One slot per ResourceKey. The slot's mutable state lives behind a
// std Mutex that is never held across an await; change notification
// goes through a watch channel so view-state controllers can subscribe
// instead of polling.

use std::any::Any;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Created but never fetched.
    Idle,
    /// A fetch is in flight. Any previously-fetched value is retained.
    Loading,
    /// The last fetch succeeded.
    Success,
    /// The last fetch failed. Any previously-fetched value is retained.
    Error,
}

/// Cloneable snapshot of a fetch failure, taken once at the boundary.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub message: String,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub status: Option<u16>,
    pub conflict: bool,
}

impl ErrorInfo {
    pub(crate) fn from_api(err: &larder_api::Error) -> Self {
        let (title, detail) = match err {
            larder_api::Error::Conflict { title, detail, .. } => {
                (Some(title.clone()), Some(detail.clone()))
            }
            larder_api::Error::Api { title, detail, .. } => (title.clone(), Some(detail.clone())),
            _ => (None, None),
        };
        Self {
            message: err.to_string(),
            title,
            detail,
            status: err.status(),
            conflict: err.is_conflict(),
        }
    }
}

/// Typed read of an entry's current state. `value` stays populated
/// through Loading and Error so consumers can keep showing last-known
/// data (stale-while-revalidate).
#[derive(Debug, Clone)]
pub struct EntrySnapshot<T> {
    pub value: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<ErrorInfo>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> EntrySnapshot<T> {
    pub(crate) fn idle() -> Self {
        Self {
            value: None,
            status: QueryStatus::Idle,
            error: None,
            last_fetched_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

// ── Internal slot ────────────────────────────────────────────────────

/// Cached values are type-erased; `ensure_fresh`/`snapshot` downcast.
pub(crate) type StoredValue = Arc<dyn Any + Send + Sync>;

/// The de-duplicated in-flight fetch: concurrent callers for the same
/// key all await one Shared future, so the fetcher runs exactly once.
pub(crate) type InFlight = Shared<BoxFuture<'static, Result<StoredValue, ErrorInfo>>>;

pub(crate) struct EntryState {
    pub value: Option<StoredValue>,
    pub status: QueryStatus,
    pub error: Option<ErrorInfo>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub in_flight: Option<InFlight>,
    /// Bumped on every invalidation. A fetch records the value it
    /// started under and refuses to stamp `last_fetched_at` if an
    /// invalidation landed while it was in flight.
    pub invalidations: u64,
    /// Live controller references; entries with zero refs become
    /// sweep candidates after a grace period.
    pub refs: usize,
    pub released_at: Option<DateTime<Utc>>,
}

impl EntryState {
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        self.last_fetched_at
            .is_none_or(|t| Utc::now() - t > stale_after)
    }
}

pub(crate) struct EntrySlot {
    pub state: Mutex<EntryState>,
    /// Bumped on every status/value/invalidation change.
    changed: watch::Sender<u64>,
}

impl EntrySlot {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0u64);
        Self {
            state: Mutex::new(EntryState {
                value: None,
                status: QueryStatus::Idle,
                error: None,
                last_fetched_at: None,
                in_flight: None,
                invalidations: 0,
                refs: 0,
                // Unreferenced from birth: sweepable once the grace
                // period elapses unless something retains it.
                released_at: Some(Utc::now()),
            }),
            changed,
        }
    }

    pub fn notify(&self) {
        self.changed.send_modify(|v| *v += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }
}
