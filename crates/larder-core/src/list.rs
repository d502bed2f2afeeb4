// ── List view-state controller ──
//
// Owns the filter/sort/pagination state for one list screen and
// derives its render state from the shared cache. Mutators are
// synchronous and cheap; `load` is the single async entry point that
// revalidates the current key through the registry.

use std::sync::Arc;

use chrono::Duration;
use futures::future::BoxFuture;
use larder_api::{FilterValue, ListQuery, Page, SortOrder};
use tokio::sync::watch;

use crate::cache::{ErrorInfo, QueryRegistry, QueryStatus, RetainGuard};
use crate::error::SyncError;
use crate::key::{ParamValue, ResourceKey, ResourceKind};

/// What a list screen renders: the current page (possibly stale), plus
/// loading/error flags. `data` stays populated while a revalidation is
/// in flight, so screens never flash empty on a refresh.
#[derive(Debug, Clone)]
pub struct ViewState<T> {
    pub data: Option<Arc<Page<T>>>,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<ErrorInfo>,
}

impl<T> ViewState<T> {
    fn empty() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_error: false,
            error: None,
        }
    }
}

/// Page fetcher for one resource kind. Receives the fully-built query;
/// path scoping (e.g. the parent milestone of a requirements list) is
/// captured by the closure itself.
pub type ListFetcher<T> =
    Arc<dyn Fn(ListQuery) -> BoxFuture<'static, Result<Page<T>, larder_api::Error>> + Send + Sync>;

pub struct ListController<T> {
    registry: Arc<QueryRegistry>,
    kind: ResourceKind,
    stale_after: Duration,
    scope: Vec<(String, ParamValue)>,
    /// What `reset` restores: the query as it stood at construction
    /// (after any `with_defaults`), page forced back to 1.
    defaults: ListQuery,
    query: ListQuery,
    fetcher: ListFetcher<T>,
    guard: Option<RetainGuard>,
}

impl<T: Send + Sync + 'static> ListController<T> {
    pub fn new(
        registry: Arc<QueryRegistry>,
        kind: ResourceKind,
        stale_after: Duration,
        fetcher: ListFetcher<T>,
    ) -> Self {
        let query = ListQuery::default();
        let guard = registry.retain(&key_for(kind, &query, &[]));
        Self {
            registry,
            kind,
            stale_after,
            scope: Vec::new(),
            defaults: query.clone(),
            query,
            fetcher,
            guard: Some(guard),
        }
    }

    /// Declare the screen's default filters/sort/page size. Becomes
    /// both the current query and what [`reset`] restores.
    ///
    /// [`reset`]: ListController::reset
    #[must_use]
    pub fn with_defaults(mut self, query: ListQuery) -> Self {
        self.defaults = query.clone();
        self.query = query;
        self.rekey();
        self
    }

    /// Pin an identity param into the cache key without sending it on
    /// the wire. Used when the request path already encodes it, e.g.
    /// the milestone a requirements list belongs to.
    #[must_use]
    pub fn scoped(mut self, field: impl Into<String>, value: ParamValue) -> Self {
        self.scope.push((field.into(), value));
        self.rekey();
        self
    }

    pub fn key(&self) -> ResourceKey {
        key_for(self.kind, &self.query, &self.scope)
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    // ── Mutators ─────────────────────────────────────────────────────
    //
    // Every filter/sort mutation snaps back to page 1: the old page
    // coordinate is meaningless against a different result set.

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.set_filter("searchText", FilterValue::Text(text.into()));
    }

    pub fn set_filter(&mut self, field: impl Into<String>, value: FilterValue) {
        self.query.filters.insert(field.into(), value);
        self.query.page_number = 1;
        self.rekey();
    }

    pub fn clear_filter(&mut self, field: &str) {
        if self.query.filters.remove(field).is_some() {
            self.query.page_number = 1;
            self.rekey();
        }
    }

    pub fn set_sort(&mut self, sort_by: impl Into<String>, order: SortOrder) {
        self.query.sort_by = Some(sort_by.into());
        self.query.order = order;
        self.query.page_number = 1;
        self.rekey();
    }

    pub fn clear_sort(&mut self) {
        if self.query.sort_by.take().is_some() {
            self.query.page_number = 1;
            self.rekey();
        }
    }

    /// Pages are 1-based; page 0 is a caller bug, not a clamp case.
    pub fn set_page(&mut self, page_number: u32) -> Result<(), SyncError> {
        if page_number == 0 {
            return Err(SyncError::Validation {
                message: "page numbers start at 1".into(),
            });
        }
        self.query.page_number = page_number;
        self.rekey();
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.query.page_size = page_size;
        self.query.page_number = 1;
        self.rekey();
    }

    /// Back to the declared defaults, page 1.
    pub fn reset(&mut self) {
        self.query = self.defaults.clone();
        self.query.page_number = 1;
        self.rekey();
    }

    fn rekey(&mut self) {
        drop(self.guard.replace(self.registry.retain(&self.key())));
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Revalidate the current key if stale and return the resulting
    /// view state. Concurrent loads of the same key share one fetch.
    pub async fn load(&self) -> ViewState<T> {
        let key = self.key();
        let fetcher = Arc::clone(&self.fetcher);
        let query = self.query.clone();
        let result = self
            .registry
            .ensure_fresh::<Page<T>, _, _>(&key, self.stale_after, move || fetcher(query))
            .await;

        // Success and failure both land in the entry; the snapshot
        // reflects either, together with any last-known-good page.
        drop(result);
        self.state()
    }

    /// User-initiated reload: mark the current key stale, then load.
    pub async fn refresh(&self) -> ViewState<T> {
        let key = self.key();
        self.registry.invalidate(|k| *k == key);
        self.load().await
    }

    /// Current render state, without triggering any fetch.
    pub fn state(&self) -> ViewState<T> {
        let snap = self.registry.snapshot::<Page<T>>(&self.key());
        if snap.status == QueryStatus::Idle {
            return ViewState::empty();
        }
        ViewState {
            data: snap.value,
            is_loading: snap.status == QueryStatus::Loading,
            is_error: snap.status == QueryStatus::Error,
            error: snap.error,
        }
    }

    /// Change notifications for the current key. Re-subscribe after
    /// mutating filters: a new key is a new channel.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.registry.subscribe(&self.key())
    }
}

fn key_for(kind: ResourceKind, query: &ListQuery, scope: &[(String, ParamValue)]) -> ResourceKey {
    let mut key = ResourceKey::from_query(kind, query);
    for (field, value) in scope {
        key = key.with_param(field.clone(), value.clone());
    }
    key
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;

    fn page_of(items: Vec<String>) -> Page<String> {
        Page {
            current_page: 1,
            total_pages: 1,
            page_size: 50,
            total_count: items.len() as u64,
            has_previous: false,
            has_next: false,
            items,
        }
    }

    fn counting_fetcher(
        calls: Arc<AtomicUsize>,
        items: Vec<String>,
    ) -> ListFetcher<String> {
        Arc::new(move |_query| {
            calls.fetch_add(1, Ordering::SeqCst);
            let items = items.clone();
            async move { Ok(page_of(items)) }.boxed()
        })
    }

    fn controller(
        registry: &Arc<QueryRegistry>,
        calls: &Arc<AtomicUsize>,
    ) -> ListController<String> {
        ListController::new(
            Arc::clone(registry),
            ResourceKind::Milestones,
            Duration::minutes(5),
            counting_fetcher(Arc::clone(calls), vec!["apple pie".into()]),
        )
    }

    #[test]
    fn filter_changes_reset_to_page_one() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctl = controller(&registry, &calls);

        ctl.set_page(4).unwrap();
        assert_eq!(ctl.query().page_number, 4);

        ctl.set_search("apple");
        assert_eq!(ctl.query().page_number, 1);

        ctl.set_page(3).unwrap();
        ctl.set_sort("Name", SortOrder::Descending);
        assert_eq!(ctl.query().page_number, 1);
    }

    #[test]
    fn page_zero_is_rejected() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctl = controller(&registry, &calls);

        let err = ctl.set_page(0).unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
        assert_eq!(ctl.query().page_number, 1);
    }

    #[tokio::test]
    async fn repeated_loads_of_one_key_fetch_once() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctl = controller(&registry, &calls);

        let first = ctl.load().await;
        let second = ctl.load().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.data.unwrap().items, vec!["apple pie".to_owned()]);
        assert!(!second.is_loading);
        assert!(!second.is_error);
    }

    #[test]
    fn reset_restores_declared_defaults() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let defaults = ListQuery::new(25)
            .with_filter("archived", FilterValue::Flag(false))
            .with_sort("Name", SortOrder::Ascending);
        let mut ctl = controller(&registry, &calls).with_defaults(defaults.clone());

        ctl.set_search("apple");
        ctl.set_sort("Points", SortOrder::Descending);
        ctl.set_page(7).unwrap();
        assert_ne!(*ctl.query(), defaults);

        ctl.reset();
        assert_eq!(*ctl.query(), defaults);
        assert_eq!(ctl.query().page_number, 1);
    }

    #[tokio::test]
    async fn refresh_forces_a_fetch_even_when_fresh() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctl = controller(&registry, &calls);

        ctl.load().await;
        ctl.load().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        ctl.refresh().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_filters_are_distinct_cache_entries() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctl = controller(&registry, &calls);

        ctl.load().await;
        ctl.set_search("apple");
        ctl.load().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Returning to the original filters is a cache hit.
        ctl.clear_filter("searchText");
        ctl.load().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loading_state_keeps_previous_data_visible() {
        let registry = Arc::new(QueryRegistry::new());
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
        let gate = Arc::new(std::sync::Mutex::new(Some(gate_rx)));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetcher: ListFetcher<String> = {
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            Arc::new(move |_query| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let gate = Arc::clone(&gate);
                async move {
                    if n > 0 {
                        let rx = gate.lock().unwrap().take();
                        if let Some(rx) = rx {
                            rx.await.ok();
                        }
                        return Ok(page_of(vec!["fresh".into()]));
                    }
                    Ok(page_of(vec!["stale".into()]))
                }
                .boxed()
            })
        };
        let ctl = ListController::new(
            Arc::clone(&registry),
            ResourceKind::Milestones,
            Duration::zero(),
            fetcher,
        );

        ctl.load().await;

        let reload = ctl.load();
        let observe = async {
            tokio::task::yield_now().await;
            let mid = ctl.state();
            assert!(mid.is_loading);
            assert_eq!(mid.data.unwrap().items, vec!["stale".to_owned()]);
            gate_tx.send(()).ok();
        };
        let (after, ()) = tokio::join!(reload, observe);

        assert!(!after.is_loading);
        assert_eq!(after.data.unwrap().items, vec!["fresh".to_owned()]);
    }

    #[tokio::test]
    async fn scope_params_separate_entries_without_touching_the_query() {
        let registry = Arc::new(QueryRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let a = controller(&registry, &calls)
            .scoped("milestoneId", ParamValue::Text("m-1".into()));
        let b = controller(&registry, &calls)
            .scoped("milestoneId", ParamValue::Text("m-2".into()));

        assert_ne!(a.key(), b.key());
        assert_eq!(a.query().filters.len(), b.query().filters.len());

        a.load().await;
        b.load().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
