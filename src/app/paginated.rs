//! Generic paginated list controller.
//!
//! Every catalogue screen (players, clubs, games, documents, ...) is the same
//! machine: a growing list fetched page by page, a "load more" trigger near
//! the end of the rendered rows, and a reset whenever the filter changes.
//! [`PaginatedList`] implements that machine once; a [`PageSource`] supplies
//! the endpoint, the filter type and an optional post-sort.
//!
//! # Invariants
//!
//! - At most one fetch per list is in flight. `is_loading` is the guard;
//!   calls made while it is set return without doing anything.
//! - Pages are requested strictly in order, each only after the previous
//!   result was observed.
//! - After every successful fetch `can_load_more == items.len() < total`.
//! - A failed fetch stops pagination (`can_load_more = false`) and records
//!   the error; nothing is retried until an explicit reload.
//! - Results that arrive after a reset or after the session token changed
//!   are discarded.
//!
//! State lives behind a short-lived `std::sync::Mutex` that is never held
//! across an await, so every method takes `&self` and a list can be shared
//! through an `Arc`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::Instrument;

use crate::domain::models::Paged;
use crate::domain::{ApiError, Keyed};
use crate::session::SessionHandle;

/// Rows requested per page unless a source says otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Prefetch starts when the rendered row is this close to the end.
pub const LOAD_MORE_THRESHOLD: usize = 3;

/// Strategy behind one list screen.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Keyed + Clone + Send + Sync + 'static;
    type Filter: Clone + PartialEq + Default + Send + Sync + std::fmt::Debug + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn page_size(&self) -> u32 {
        DEFAULT_PAGE_SIZE
    }

    /// Fetches one page. `page` is 1-based.
    async fn fetch(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &Self::Filter,
    ) -> Result<Paged<Self::Item>, ApiError>;

    /// Stable post-processing applied to the whole accumulated list after each
    /// successful fetch.
    fn arrange(&self, _items: &mut Vec<Self::Item>) {}
}

/// Copy of a list's state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T, F> {
    /// Rows loaded so far, in display order.
    pub items: Vec<T>,
    /// Next page to request.
    pub page: u32,
    /// Row count reported by the last successful page.
    pub total: Option<u64>,
    pub is_loading: bool,
    /// `false` once every row is loaded or a fetch failed.
    pub can_load_more: bool,
    pub filter: F,
    /// Failure that stopped pagination, cleared by the next reset.
    pub last_error: Option<ApiError>,
}

struct ListState<T, F> {
    items: Vec<T>,
    page: u32,
    total: Option<u64>,
    is_loading: bool,
    can_load_more: bool,
    filter: F,
    last_error: Option<ApiError>,
    /// Bumped by every reset; a fetch started under an older generation is stale.
    generation: u64,
}

impl<T, F: Default> Default for ListState<T, F> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total: None,
            is_loading: false,
            can_load_more: true,
            filter: F::default(),
            last_error: None,
            generation: 0,
        }
    }
}

/// Clears `is_loading` if a fetch future is dropped before it completes.
struct InFlight<'a, S: PageSource> {
    list: &'a PaginatedList<S>,
    armed: bool,
}

impl<S: PageSource> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(list = self.list.source.name(), "fetch abandoned");
            self.list.lock().is_loading = false;
        }
    }
}

/// Outcome of one pass through the fetch loop.
enum Step {
    Done,
    Retry,
}

/// A list screen's controller.
///
/// # Examples
///
/// ```no_run
/// use mihf::app::PlayersList;
/// # async fn demo(list: PlayersList) {
/// list.reload().await;
/// let snapshot = list.snapshot();
/// if let Some(last) = snapshot.items.last() {
///     list.load_more_if_needed(Some(&last.id)).await;
/// }
/// # }
/// ```
pub struct PaginatedList<S: PageSource> {
    source: S,
    session: SessionHandle,
    page_size: u32,
    state: Mutex<ListState<S::Item, S::Filter>>,
}

impl<S: PageSource> std::fmt::Debug for PaginatedList<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PaginatedList")
            .field("source", &self.source.name())
            .field("items", &state.items.len())
            .field("page", &state.page)
            .field("is_loading", &state.is_loading)
            .field("can_load_more", &state.can_load_more)
            .finish_non_exhaustive()
    }
}

impl<S: PageSource> PaginatedList<S> {
    #[must_use]
    pub fn new(source: S, session: SessionHandle) -> Self {
        let page_size = source.page_size();
        Self {
            source,
            session,
            page_size,
            state: Mutex::new(ListState::default()),
        }
    }

    /// Starts with `filter` instead of the default one, without fetching.
    #[must_use]
    pub fn with_filter(self, filter: S::Filter) -> Self {
        self.lock().filter = filter;
        self
    }

    /// Overrides the source's page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, ListState<S::Item, S::Filter>> {
        // A panic while holding the lock cannot leave the state half-written,
        // every critical section is a handful of assignments.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Clears the list and fetches page 1.
    ///
    /// If a fetch is already in flight it is not duplicated: its result is
    /// dropped on arrival and that same in-flight slot fetches page 1 instead.
    pub async fn reload(&self) -> bool {
        self.reset_with(None);
        self.load_next().await
    }

    /// Replaces the filter and reloads. Equal filters are a no-op.
    ///
    /// Returns `true` if the filter changed.
    pub async fn apply_filter(&self, filter: S::Filter) -> bool {
        {
            let state = self.lock();
            if state.filter == filter {
                tracing::trace!(list = self.source.name(), "filter unchanged");
                return false;
            }
        }
        self.reset_with(Some(filter));
        self.load_next().await;
        true
    }

    fn reset_with(&self, filter: Option<S::Filter>) {
        let mut state = self.lock();
        if let Some(filter) = filter {
            tracing::debug!(list = self.source.name(), filter = ?filter, "filter changed");
            state.filter = filter;
        }
        state.items.clear();
        state.page = 1;
        state.total = None;
        state.can_load_more = true;
        state.last_error = None;
        state.generation = state.generation.wrapping_add(1);
    }

    /// Prefetches when `current` is among the last rows, or loads the first
    /// page when nothing is rendered yet (`None`).
    pub async fn load_more_if_needed(&self, current: Option<&<S::Item as Keyed>::Key>) -> bool {
        let Some(current) = current else {
            return self.load_next().await;
        };

        let near_end = {
            let state = self.lock();
            let threshold = state.items.len().saturating_sub(LOAD_MORE_THRESHOLD);
            state
                .items
                .iter()
                .position(|item| item.key() == *current)
                .is_some_and(|index| index >= threshold)
        };

        if near_end {
            self.load_next().await
        } else {
            false
        }
    }

    /// Fetches the next page.
    ///
    /// Returns `false` without doing anything while another fetch is in
    /// flight, once the list is exhausted or failed, or when signed out.
    pub async fn load_next(&self) -> bool {
        let mut issued = false;
        loop {
            let (page, filter, generation, token) = {
                let mut state = self.lock();
                if state.is_loading || !state.can_load_more {
                    return issued;
                }
                let Some(token) = self.session.token() else {
                    tracing::debug!(list = self.source.name(), "not signed in, skipping fetch");
                    return issued;
                };
                state.is_loading = true;
                (state.page, state.filter.clone(), state.generation, token)
            };
            issued = true;

            let mut in_flight = InFlight {
                list: self,
                armed: true,
            };
            let span = tracing::debug_span!("list_fetch", list = self.source.name(), page);
            tracing::debug!(parent: &span, limit = self.page_size, "fetching page");
            let result = self
                .source
                .fetch(&token, page, self.page_size, &filter)
                .instrument(span)
                .await;
            in_flight.armed = false;

            match self.finish(generation, &token, result) {
                Step::Done => return true,
                Step::Retry => continue,
            }
        }
    }

    fn finish(
        &self,
        generation: u64,
        token: &str,
        result: Result<Paged<S::Item>, ApiError>,
    ) -> Step {
        let name = self.source.name();
        let mut state = self.lock();
        state.is_loading = false;

        if state.generation != generation {
            tracing::debug!(list = name, "list was reset during fetch, refetching");
            return Step::Retry;
        }
        if self.session.token().as_deref() != Some(token) {
            tracing::debug!(list = name, "session changed during fetch, discarding result");
            return Step::Done;
        }

        match result {
            Ok(page) => {
                let received = page.data.len();
                for item in page.data {
                    let key = item.key();
                    if state.items.iter().any(|existing| existing.key() == key) {
                        tracing::debug!(list = name, key = ?key, "duplicate row skipped");
                        continue;
                    }
                    state.items.push(item);
                }
                self.source.arrange(&mut state.items);

                state.total = Some(page.total);
                state.can_load_more = (state.items.len() as u64) < page.total;
                state.page += 1;
                state.last_error = None;

                tracing::debug!(
                    list = name,
                    received,
                    loaded = state.items.len(),
                    total = page.total,
                    can_load_more = state.can_load_more,
                    "page appended"
                );
            }
            Err(e) => {
                tracing::debug!(list = name, error = %e, "fetch failed, pagination stopped");
                state.can_load_more = false;
                state.last_error = Some(e);
            }
        }
        Step::Done
    }

    /// Applies `patch` to the loaded row with `key`. Returns `false` if absent.
    pub fn update_item(
        &self,
        key: &<S::Item as Keyed>::Key,
        patch: impl FnOnce(&mut S::Item),
    ) -> bool {
        let mut state = self.lock();
        match state.items.iter_mut().find(|item| item.key() == *key) {
            Some(item) => {
                patch(item);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot<S::Item, S::Filter> {
        let state = self.lock();
        ListSnapshot {
            items: state.items.clone(),
            page: state.page,
            total: state.total,
            is_loading: state.is_loading,
            can_load_more: state.can_load_more,
            filter: state.filter.clone(),
            last_error: state.last_error.clone(),
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<S::Item> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.lock().page
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.lock().can_load_more
    }

    #[must_use]
    pub fn filter(&self) -> S::Filter {
        self.lock().filter.clone()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ApiError> {
        self.lock().last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::storage::{MemoryCache, MemoryCredentialStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(i64);

    impl Keyed for Row {
        type Key = i64;

        fn key(&self) -> i64 {
            self.0
        }
    }

    /// Serves `total` rows, optionally parking each fetch until released.
    struct Numbers {
        total: u64,
        calls: Arc<AtomicUsize>,
        requested: Arc<Mutex<Vec<(u32, u8)>>>,
        gate: Option<Arc<Notify>>,
        fail_on_page: Option<u32>,
    }

    impl Numbers {
        fn new(total: u64) -> Self {
            Self {
                total,
                calls: Arc::new(AtomicUsize::new(0)),
                requested: Arc::new(Mutex::new(Vec::new())),
                gate: None,
                fail_on_page: None,
            }
        }
    }

    #[async_trait]
    impl PageSource for Numbers {
        type Item = Row;
        type Filter = u8;

        fn name(&self) -> &'static str {
            "numbers"
        }

        async fn fetch(
            &self,
            _token: &str,
            page: u32,
            limit: u32,
            filter: &u8,
        ) -> Result<Paged<Row>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().expect("lock").push((page, *filter));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_on_page == Some(page) {
                return Err(ApiError::ServerStatus(500));
            }
            let start = u64::from((page - 1) * limit);
            let end = (start + u64::from(limit)).min(self.total);
            let data = (start..end)
                .map(|n| Row(i64::try_from(n).expect("small") + i64::from(*filter) * 1000))
                .collect();
            Ok(Paged {
                data,
                total: self.total,
                page: Some(page),
                limit: Some(limit),
            })
        }
    }

    async fn signed_in() -> SessionHandle {
        let session = SessionHandle::spawn(
            Box::new(MemoryCredentialStore::default()),
            Box::new(MemoryCache::default()),
        )
        .expect("spawn");
        let user = User {
            id: "1".into(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            middle_name: None,
            date_of_birth: None,
            email: None,
            phone: "79101234567".into(),
            roles: vec![],
        };
        session.login("abc".into(), user).await.expect("login");
        session
    }

    #[tokio::test]
    async fn three_pages_of_forty_five() {
        let list = PaginatedList::new(Numbers::new(45), signed_in().await);

        let mut lengths = Vec::new();
        let mut more = Vec::new();
        let mut pages = Vec::new();
        for _ in 0..3 {
            assert!(list.load_next().await);
            lengths.push(list.len());
            more.push(list.can_load_more());
            pages.push(list.page());
        }

        assert_eq!(lengths, vec![20, 40, 45]);
        assert_eq!(more, vec![true, true, false]);
        assert_eq!(pages, vec![2, 3, 4]);
        assert_eq!(list.snapshot().total, Some(45));
        assert!(!list.load_next().await, "exhausted list must not fetch");
    }

    #[tokio::test]
    async fn signed_out_list_does_nothing() {
        let session = SessionHandle::spawn(
            Box::new(MemoryCredentialStore::default()),
            Box::new(MemoryCache::default()),
        )
        .expect("spawn");
        let source = Numbers::new(45);
        let calls = source.calls.clone();
        let list = PaginatedList::new(source, session);

        assert!(!list.load_next().await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(list.page(), 1);
    }

    #[tokio::test]
    async fn failure_stops_pagination() {
        let mut source = Numbers::new(45);
        source.fail_on_page = Some(2);
        let list = PaginatedList::new(source, signed_in().await);

        list.load_next().await;
        list.load_next().await;

        let snapshot = list.snapshot();
        assert_eq!(snapshot.items.len(), 20);
        assert!(!snapshot.can_load_more);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.page, 2);
        assert_eq!(snapshot.last_error, Some(ApiError::ServerStatus(500)));
        assert!(!list.load_next().await);
    }

    #[tokio::test]
    async fn concurrent_load_next_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut source = Numbers::new(45);
        source.gate = Some(gate.clone());
        let calls = source.calls.clone();
        let list = Arc::new(PaginatedList::new(source, signed_in().await));

        let first = tokio::spawn({
            let list = list.clone();
            async move { list.load_next().await }
        });
        while !list.is_loading() {
            tokio::task::yield_now().await;
        }

        assert!(!list.load_next().await);
        assert_eq!(list.page(), 1);

        gate.notify_one();
        assert!(first.await.expect("join"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(list.page(), 2);
    }

    #[tokio::test]
    async fn equal_filter_is_a_noop() {
        let source = Numbers::new(45);
        let calls = source.calls.clone();
        let list = PaginatedList::new(source, signed_in().await);
        list.load_next().await;

        assert!(!list.apply_filter(0).await);
        assert_eq!(list.page(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn new_filter_resets_and_fetches_once() {
        let source = Numbers::new(45);
        let calls = source.calls.clone();
        let requested = source.requested.clone();
        let list = PaginatedList::new(source, signed_in().await);
        list.load_next().await;
        list.load_next().await;

        assert!(list.apply_filter(7).await);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(requested.lock().expect("lock").last(), Some(&(1, 7)));
        assert_eq!(list.len(), 20);
        assert_eq!(list.page(), 2);
        assert_eq!(list.items()[0], Row(7000));
    }

    #[tokio::test]
    async fn reset_during_fetch_refetches_first_page() {
        let gate = Arc::new(Notify::new());
        let mut source = Numbers::new(45);
        source.gate = Some(gate.clone());
        let requested = source.requested.clone();
        let list = Arc::new(PaginatedList::new(source, signed_in().await));

        let first = tokio::spawn({
            let list = list.clone();
            async move { list.load_next().await }
        });
        while !list.is_loading() {
            tokio::task::yield_now().await;
        }

        // The in-flight slot is taken, so the filter change does not issue a
        // second concurrent request.
        assert!(list.apply_filter(3).await);
        assert_eq!(requested.lock().expect("lock").len(), 1);

        gate.notify_one();
        while requested.lock().expect("lock").len() < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        assert!(first.await.expect("join"));

        let seen = requested.lock().expect("lock").clone();
        assert_eq!(seen, vec![(1, 0), (1, 3)]);
        assert_eq!(list.items()[0], Row(3000));
        assert_eq!(list.len(), 20);
    }

    #[tokio::test]
    async fn prefetch_triggers_near_the_end_only() {
        let source = Numbers::new(45);
        let calls = source.calls.clone();
        let list = PaginatedList::new(source, signed_in().await);

        assert!(list.load_more_if_needed(None).await, "empty list loads first page");
        assert!(!list.load_more_if_needed(Some(&5)).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(list.load_more_if_needed(Some(&17)).await);
        assert_eq!(list.len(), 40);
        assert!(!list.load_more_if_needed(Some(&999)).await, "unknown key");
    }

    #[tokio::test]
    async fn dropped_fetch_releases_the_slot() {
        let gate = Arc::new(Notify::new());
        let mut source = Numbers::new(45);
        source.gate = Some(gate);
        let list = PaginatedList::new(source, signed_in().await);

        let mut pending = Box::pin(list.load_next());
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(10), &mut pending)
                .await
                .is_err()
        );
        assert!(list.is_loading());
        drop(pending);
        assert!(!list.is_loading());
    }

    #[tokio::test]
    async fn update_item_patches_in_place() {
        let list = PaginatedList::new(Numbers::new(5), signed_in().await);
        list.load_next().await;

        assert!(list.update_item(&2, |row| row.0 = 200));
        assert!(!list.update_item(&42, |row| row.0 = 0));
        assert_eq!(list.items()[2], Row(200));
    }
}
