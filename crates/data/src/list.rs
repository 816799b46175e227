//! List retriever: state machine behind paginated, searchable list views.
//!
//! Every load is issued synchronously (state flips to `Loading` and the
//! request gets a sequence number the moment the method is called) and then
//! runs as the returned future. Under [`ResponseOrdering::LatestIssued`] a
//! response is applied only if no later request was issued meanwhile.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use tenantkit_core::{DataError, DataResult, Entity};

use crate::cursor::{Cursor, Page, PageCursor};
use crate::graph::Node;
use crate::kind::EntityKind;

/// What a list source is asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search_term: String,
    pub params: Vec<(String, String)>,
    pub cursor: Option<PageCursor>,
}

/// Anything that can serve pages of `T`.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    async fn fetch(&self, query: ListQuery) -> DataResult<Page<T>>;
}

/// Identity used by [`DataListRetriever::remove_element`] and
/// [`DataListRetriever::set_refreshed_element`].
pub trait ListItem {
    fn key(&self) -> Option<&str>;
}

impl<K: EntityKind> ListItem for Node<K> {
    fn key(&self) -> Option<&str> {
        Entity::id(&**self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStatus {
    /// Not ready, or ready but never loaded.
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Last attempt failed; previously loaded data is kept.
    Failed,
}

/// How an adjacent page combines with the current data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// `next` appends, `previous` prepends.
    Append,
    Replace,
}

/// Which of several in-flight responses gets applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Apply a response only if it belongs to the latest issued request.
    #[default]
    LatestIssued,
    /// Apply every response as it resolves; the last to resolve wins even
    /// when it answers an older request.
    LastResolved,
}

/// Observable state of one list view.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    status: ListStatus,
    ready: bool,
    data: Vec<T>,
    search_term: String,
    additional_params: Vec<(String, String)>,
    next: Option<Cursor>,
    previous: Option<Cursor>,
    total: Option<u64>,
    last_error: Option<DataError>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            status: ListStatus::Idle,
            ready: false,
            data: Vec::new(),
            search_term: String::new(),
            additional_params: Vec::new(),
            next: None,
            previous: None,
            total: None,
            last_error: None,
        }
    }
}

impl<T> ListState<T> {
    pub fn status(&self) -> ListStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_loaded(&self) -> bool {
        self.status == ListStatus::Loaded
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn additional_params(&self) -> &[(String, String)] {
        &self.additional_params
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next.as_ref()
    }

    pub fn previous_cursor(&self) -> Option<&Cursor> {
        self.previous.as_ref()
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn last_error(&self) -> Option<&DataError> {
        self.last_error.as_ref()
    }
}

struct Ticket {
    seq: u64,
    query: ListQuery,
    paging: Paging,
    direction: Direction,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Reset,
    Forward,
    Backward,
}

struct Inner<T> {
    state: ListState<T>,
    issued: u64,
}

struct Shared<T> {
    source: Arc<dyn ListSource<T>>,
    ordering: ResponseOrdering,
    inner: Mutex<Inner<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, ticket: Ticket) -> DataResult<()> {
        let result = self.source.fetch(ticket.query).await;

        let mut inner = self.lock();
        if self.ordering == ResponseOrdering::LatestIssued && ticket.seq != inner.issued {
            tracing::warn!(
                seq = ticket.seq,
                latest = inner.issued,
                "discarding stale list response"
            );
            return Ok(());
        }

        let state = &mut inner.state;
        match result {
            Ok(page) => {
                apply_page(state, page, ticket.paging, ticket.direction);
                state.status = ListStatus::Loaded;
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(seq = ticket.seq, error = %err, "list load failed");
                state.status = ListStatus::Failed;
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

fn apply_page<T>(state: &mut ListState<T>, page: Page<T>, paging: Paging, direction: Direction) {
    if let Some(total) = page.total {
        state.total = Some(total);
    }

    match (paging, direction) {
        (Paging::Append, Direction::Forward) => {
            state.data.extend(page.items);
            state.next = page.next;
        }
        (Paging::Append, Direction::Backward) => {
            let mut items = page.items;
            items.append(&mut state.data);
            state.data = items;
            state.previous = page.previous;
        }
        (Paging::Replace, _) | (_, Direction::Reset) => {
            if direction == Direction::Reset {
                state.total = page.total;
            }
            state.data = page.items;
            state.next = page.next;
            state.previous = page.previous;
        }
    }
}

/// Handle over one list view's state. Clones share the state.
pub struct DataListRetriever<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for DataListRetriever<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> DataListRetriever<T> {
    pub fn new(source: Arc<dyn ListSource<T>>) -> Self {
        Self::with_ordering(source, ResponseOrdering::default())
    }

    pub fn with_ordering(source: Arc<dyn ListSource<T>>, ordering: ResponseOrdering) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                ordering,
                inner: Mutex::new(Inner {
                    state: ListState::default(),
                    issued: 0,
                }),
            }),
        }
    }

    pub fn ordering(&self) -> ResponseOrdering {
        self.shared.ordering
    }

    /// Open or close the gate. Opening a list that never loaded starts the
    /// first load.
    pub fn set_ready(&self, ready: bool) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = {
            let mut inner = self.shared.lock();
            let first_load = ready && !inner.state.ready && inner.state.status == ListStatus::Idle;
            inner.state.ready = ready;
            if first_load {
                issue(&mut inner, Direction::Reset, Paging::Replace)
            } else {
                None
            }
        };
        self.launch(ticket)
    }

    /// Reload the first page with the current search term and filters.
    pub fn refresh(&self) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = issue(&mut self.shared.lock(), Direction::Reset, Paging::Replace);
        self.launch(ticket)
    }

    /// Replace the result set with the first page matching `term`.
    pub fn search(&self, term: impl Into<String>) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = {
            let mut inner = self.shared.lock();
            inner.state.search_term = term.into();
            issue(&mut inner, Direction::Reset, Paging::Replace)
        };
        self.launch(ticket)
    }

    /// Load the page after the current one, if the server gave a cursor.
    pub fn next(&self, paging: Paging) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = issue(&mut self.shared.lock(), Direction::Forward, paging);
        self.launch(ticket)
    }

    /// Load the page before the current one, if the server gave a cursor.
    pub fn previous(&self, paging: Paging) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = issue(&mut self.shared.lock(), Direction::Backward, paging);
        self.launch(ticket)
    }

    /// Set a filter and reload from the first page.
    pub fn add_additional_parameter(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = {
            let mut inner = self.shared.lock();
            let (key, value) = (key.into(), value.into());
            let params = &mut inner.state.additional_params;
            match params.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => params.push((key, value)),
            }
            issue(&mut inner, Direction::Reset, Paging::Replace)
        };
        self.launch(ticket)
    }

    /// Drop a filter and reload from the first page.
    pub fn remove_additional_parameter(
        &self,
        key: &str,
    ) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let ticket = {
            let mut inner = self.shared.lock();
            inner.state.additional_params.retain(|(k, _)| k != key);
            issue(&mut inner, Direction::Reset, Paging::Replace)
        };
        self.launch(ticket)
    }

    fn launch(&self, ticket: Option<Ticket>) -> impl Future<Output = DataResult<()>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        async move {
            match ticket {
                Some(ticket) => shared.run(ticket).await,
                None => Ok(()),
            }
        }
    }

    pub fn status(&self) -> ListStatus {
        self.shared.lock().state.status
    }

    pub fn is_ready(&self) -> bool {
        self.shared.lock().state.ready
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.lock().state.is_loaded()
    }

    pub fn total(&self) -> Option<u64> {
        self.shared.lock().state.total
    }

    pub fn search_term(&self) -> String {
        self.shared.lock().state.search_term.clone()
    }

    pub fn has_next(&self) -> bool {
        self.shared.lock().state.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.shared.lock().state.previous.is_some()
    }

    pub fn last_error(&self) -> Option<DataError> {
        self.shared.lock().state.last_error.clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&ListState<T>) -> R) -> R {
        f(&self.shared.lock().state)
    }
}

impl<T: Clone + Send + Sync + 'static> DataListRetriever<T> {
    pub fn data(&self) -> Vec<T> {
        self.shared.lock().state.data.clone()
    }

    pub fn snapshot(&self) -> ListState<T> {
        self.shared.lock().state.clone()
    }
}

impl<T: ListItem + Send + Sync + 'static> DataListRetriever<T> {
    /// Drop the item with `key` locally (after a delete made elsewhere).
    pub fn remove_element(&self, key: &str) -> bool {
        let mut inner = self.shared.lock();
        let state = &mut inner.state;
        let before = state.data.len();
        state.data.retain(|item| item.key() != Some(key));
        let removed = before - state.data.len();
        if let Some(total) = state.total.as_mut() {
            *total = total.saturating_sub(removed as u64);
        }
        removed > 0
    }

    /// Swap in a freshly fetched copy of an item already in the list.
    pub fn set_refreshed_element(&self, item: T) -> bool {
        let Some(key) = item.key().map(str::to_string) else {
            return false;
        };
        let mut inner = self.shared.lock();
        match inner
            .state
            .data
            .iter_mut()
            .find(|existing| existing.key() == Some(key.as_str()))
        {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }
}

/// Stamp a new request and move to `Loading`. Returns `None` when the list
/// is gated or there is no cursor in the requested direction.
fn issue<T>(inner: &mut Inner<T>, direction: Direction, paging: Paging) -> Option<Ticket> {
    let state = &mut inner.state;
    if !state.ready {
        tracing::debug!("list not ready; load skipped");
        return None;
    }

    let cursor = match direction {
        Direction::Reset => None,
        Direction::Forward => Some(PageCursor::Next(state.next.clone()?)),
        Direction::Backward => Some(PageCursor::Previous(state.previous.clone()?)),
    };

    let query = ListQuery {
        search_term: state.search_term.clone(),
        params: state.additional_params.clone(),
        cursor,
    };

    state.status = ListStatus::Loading;
    inner.issued += 1;
    Some(Ticket {
        seq: inner.issued,
        query,
        paging,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::sync::oneshot;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row(&'static str);

    impl ListItem for Row {
        fn key(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    fn cursor(token: &str) -> Cursor {
        serde_json::from_value(serde_json::json!(token)).unwrap()
    }

    fn keys(retriever: &DataListRetriever<Row>) -> Vec<&'static str> {
        retriever.data().into_iter().map(|r| r.0).collect()
    }

    /// Serves fixed pages keyed by cursor token ("" for the first page).
    struct Pages {
        pages: HashMap<String, DataResult<Page<Row>>>,
        seen: Mutex<Vec<ListQuery>>,
    }

    impl Pages {
        fn new(pages: Vec<(&str, DataResult<Page<Row>>)>) -> Arc<Self> {
            Arc::new(Self {
                pages: pages.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ListSource<Row> for Pages {
        async fn fetch(&self, query: ListQuery) -> DataResult<Page<Row>> {
            let key = query
                .cursor
                .as_ref()
                .map(|c| c.cursor().as_str().to_string())
                .unwrap_or_default();
            self.seen.lock().unwrap().push(query);
            self.pages
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Err(DataError::api(404, "no such page")))
        }
    }

    fn page(rows: &[&'static str], next: Option<&str>, previous: Option<&str>) -> Page<Row> {
        Page {
            items: rows.iter().map(|r| Row(r)).collect(),
            next: next.map(cursor),
            previous: previous.map(cursor),
            total: Some(4),
        }
    }

    #[tokio::test]
    async fn stays_idle_until_ready() {
        let source = Pages::new(vec![("", Ok(page(&["a"], None, None)))]);
        let list = DataListRetriever::<Row>::new(source.clone());

        list.refresh().await.unwrap();
        assert_eq!(list.status(), ListStatus::Idle);
        assert!(source.seen.lock().unwrap().is_empty());

        list.set_ready(true).await.unwrap();
        assert_eq!(list.status(), ListStatus::Loaded);
        assert_eq!(keys(&list), vec!["a"]);
        assert_eq!(list.total(), Some(4));
    }

    #[tokio::test]
    async fn pages_append_and_replace() {
        let source = Pages::new(vec![
            ("", Ok(page(&["a", "b"], Some("p2"), None))),
            ("p2", Ok(page(&["c", "d"], None, Some("p1")))),
            ("p1", Ok(page(&["a", "b"], Some("p2"), None))),
        ]);
        let list = DataListRetriever::<Row>::new(source);
        list.set_ready(true).await.unwrap();

        list.next(Paging::Append).await.unwrap();
        assert_eq!(keys(&list), vec!["a", "b", "c", "d"]);
        assert!(!list.has_next());

        list.refresh().await.unwrap();
        list.next(Paging::Replace).await.unwrap();
        assert_eq!(keys(&list), vec!["c", "d"]);
        assert!(list.has_previous());

        list.previous(Paging::Replace).await.unwrap();
        assert_eq!(keys(&list), vec!["a", "b"]);

        // no cursor in that direction: nothing is issued
        list.previous(Paging::Append).await.unwrap();
        assert_eq!(keys(&list), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let source = Pages::new(vec![
            ("", Ok(page(&["a"], Some("broken"), None))),
        ]);
        let list = DataListRetriever::<Row>::new(source);
        list.set_ready(true).await.unwrap();

        let err = list.next(Paging::Append).await.unwrap_err();
        assert_eq!(err, DataError::api(404, "no such page"));
        assert_eq!(list.status(), ListStatus::Failed);
        assert_eq!(keys(&list), vec!["a"]);
        assert_eq!(list.last_error(), Some(err));

        list.refresh().await.unwrap();
        assert_eq!(list.status(), ListStatus::Loaded);
        assert!(list.last_error().is_none());
    }

    #[tokio::test]
    async fn filters_and_search_reset_the_cursor() {
        let source = Pages::new(vec![
            ("", Ok(page(&["a"], Some("p2"), None))),
            ("p2", Ok(page(&["b"], None, Some("p1")))),
        ]);
        let list = DataListRetriever::<Row>::new(source.clone());
        list.set_ready(true).await.unwrap();
        list.next(Paging::Replace).await.unwrap();

        list.add_additional_parameter("status", "active").await.unwrap();
        list.search("ann").await.unwrap();
        list.remove_additional_parameter("status").await.unwrap();

        let seen = source.seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!(last.cursor, None);
        assert_eq!(last.search_term, "ann");
        assert!(last.params.is_empty());
        assert_eq!(seen[2].params, vec![("status".to_string(), "active".to_string())]);
        drop(seen);
        assert_eq!(keys(&list), vec!["a"]);
    }

    #[tokio::test]
    async fn local_edits_touch_only_matching_items() {
        let source = Pages::new(vec![("", Ok(page(&["a", "b"], None, None)))]);
        let list = DataListRetriever::<Row>::new(source);
        list.set_ready(true).await.unwrap();

        assert!(list.remove_element("a"));
        assert!(!list.remove_element("zzz"));
        assert_eq!(keys(&list), vec!["b"]);
        assert_eq!(list.total(), Some(3));

        assert!(list.set_refreshed_element(Row("b")));
        assert!(!list.set_refreshed_element(Row("c")));
        assert_eq!(keys(&list), vec!["b"]);
    }

    /// Each search term waits for the test to release its response.
    struct Gated {
        gates: Mutex<HashMap<String, oneshot::Receiver<Vec<Row>>>>,
    }

    #[async_trait]
    impl ListSource<Row> for Gated {
        async fn fetch(&self, query: ListQuery) -> DataResult<Page<Row>> {
            let gate = self
                .gates
                .lock()
                .unwrap()
                .remove(&query.search_term)
                .ok_or_else(|| DataError::transport("unexpected search"))?;
            let rows = gate.await.map_err(|e| DataError::transport(e.to_string()))?;
            Ok(Page::new(rows))
        }
    }

    /// `search("bob")` then `search("")`, with "bob" resolving last.
    async fn race(ordering: ResponseOrdering) -> Vec<&'static str> {
        let (bob_tx, bob_rx) = oneshot::channel();
        let (all_tx, all_rx) = oneshot::channel();
        let source = Arc::new(Gated {
            gates: Mutex::new(HashMap::from([
                ("bob".to_string(), bob_rx),
                (String::new(), all_rx),
            ])),
        });

        let list = DataListRetriever::<Row>::with_ordering(source, ordering);
        {
            let mut inner = list.shared.lock();
            inner.state.ready = true;
        }

        let bob = tokio::spawn(list.search("bob"));
        let all = tokio::spawn(list.search(""));

        all_tx.send(vec![Row("ann"), Row("bob")]).unwrap();
        all.await.unwrap().unwrap();
        bob_tx.send(vec![Row("bob")]).unwrap();
        bob.await.unwrap().unwrap();

        assert_eq!(list.search_term(), "");
        keys(&list)
    }

    #[tokio::test]
    async fn latest_issued_ignores_stale_search() {
        assert_eq!(race(ResponseOrdering::LatestIssued).await, vec!["ann", "bob"]);
    }

    #[tokio::test]
    async fn last_resolved_lets_stale_search_win() {
        // Known race: the older "bob" response lands after "" and overwrites it.
        assert_eq!(race(ResponseOrdering::LastResolved).await, vec!["bob"]);
    }
}
