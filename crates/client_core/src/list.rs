//! User list controller: cursor-paginated browsing plus debounced search,
//! merged into a single published [`ListState`].

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use shared::{
    domain::UserId,
    error::TransportError,
    protocol::{SearchPage, UserSummary},
};
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    debounce::spawn_query_debouncer,
    gateway::{GatewayResult, UserGateway},
    pagination::Pagination,
};

pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    /// Full accumulated list in fetch order.
    Ready(Vec<UserSummary>),
    Failed(String),
}

impl ListState {
    pub fn items(&self) -> Option<&[UserSummary]> {
        match self {
            ListState::Ready(items) => Some(items),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            ListState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ListState::Loading)
    }
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub page_size: u32,
    pub search_debounce: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: crate::gateway::DEFAULT_PAGE_SIZE,
            search_debounce: Duration::from_millis(500),
        }
    }
}

impl From<&Settings> for ListOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            page_size: settings.page_size,
            search_debounce: settings.search_debounce(),
        }
    }
}

struct ListInner {
    pagination: Pagination,
    /// Bumped by every request that replaces the list wholesale. A fetch
    /// only publishes if its captured value is still current.
    generation: u64,
    items: Vec<UserSummary>,
}

pub struct UserListController {
    gateway: Arc<dyn UserGateway>,
    runtime: Handle,
    options: ListOptions,
    inner: Mutex<ListInner>,
    state: watch::Sender<ListState>,
    query: watch::Sender<String>,
    raw_query_tx: mpsc::UnboundedSender<String>,
    debouncer: JoinHandle<()>,
}

impl UserListController {
    /// Builds an idle controller publishing `Loading`. Nothing is fetched
    /// until the first `refresh`, `load_more` or settled query.
    pub fn new(gateway: Arc<dyn UserGateway>, runtime: Handle, options: ListOptions) -> Arc<Self> {
        let (state, _) = watch::channel(ListState::Loading);
        let (query, _) = watch::channel(String::new());
        let (raw_query_tx, raw_query_rx) = mpsc::unbounded_channel();

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let debouncer = spawn_query_debouncer(
                &runtime,
                options.search_debounce,
                raw_query_rx,
                move |query| {
                    if let Some(controller) = weak.upgrade() {
                        controller.evaluate_query(query);
                    }
                },
            );

            Self {
                gateway,
                runtime,
                options,
                inner: Mutex::new(ListInner {
                    pagination: Pagination::default(),
                    generation: 0,
                    items: Vec::new(),
                }),
                state,
                query,
                raw_query_tx,
                debouncer,
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    pub fn state_stream(&self) -> WatchStream<ListState> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// Latest raw query text, settled or not.
    pub fn query(&self) -> String {
        self.query.borrow().clone()
    }

    pub fn subscribe_query(&self) -> watch::Receiver<String> {
        self.query.subscribe()
    }

    pub fn is_searching(&self) -> bool {
        self.lock().pagination.is_searching()
    }

    pub fn can_load_more(&self) -> bool {
        self.lock().pagination.can_load_more()
    }

    /// Records the latest search text. Non-blank text is searched once it
    /// has been stable for the debounce delay; blank text returns to
    /// browsing right away.
    pub fn set_query(self: &Arc<Self>, text: impl Into<String>) {
        let text = text.into();
        self.query.send_replace(text.clone());

        if text.trim().is_empty() {
            info!("list: blank query, returning to browse");
            self.refresh();
        }

        if self.raw_query_tx.send(text).is_err() {
            warn!("list: query debouncer has stopped; query ignored");
        }
    }

    /// Requests the next browse page. Dropped while a fetch is in flight,
    /// while searching, or once an empty page has been seen.
    pub fn load_more(self: &Arc<Self>) {
        let (generation, cursor) = {
            let mut inner = self.lock();
            if !inner.pagination.can_load_more() {
                debug!(
                    in_flight = inner.pagination.in_flight(),
                    end_of_data = inner.pagination.end_of_data(),
                    searching = inner.pagination.is_searching(),
                    "list: load_more ignored"
                );
                return;
            }
            inner.pagination = inner.pagination.begin_page();
            (inner.generation, inner.pagination.cursor())
        };

        self.spawn_browse_fetch(generation, cursor);
    }

    /// Drops everything accumulated, leaves search mode and fetches the
    /// first browse page. Supersedes any fetch in flight.
    pub fn refresh(self: &Arc<Self>) {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.items.clear();
            inner.pagination = Pagination::restart_browse();
            self.state.send_replace(ListState::Loading);
            inner.generation
        };

        self.spawn_browse_fetch(generation, None);
    }

    fn lock(&self) -> MutexGuard<'_, ListInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evaluate_query(self: &Arc<Self>, query: String) {
        let generation = {
            let mut inner = self.lock();
            // Checked under the lock: a blank `set_query` racing the debouncer
            // has already replaced the text and will refresh after us.
            if *self.query.borrow() != query {
                debug!(
                    query = %query,
                    "list: query replaced before evaluation, search skipped"
                );
                return;
            }
            if inner.pagination.active_query() == Some(query.as_str()) {
                debug!(query = %query, "list: query unchanged, search skipped");
                return;
            }
            inner.generation += 1;
            inner.items.clear();
            inner.pagination = Pagination::start_search(query.clone());
            self.state.send_replace(ListState::Loading);
            inner.generation
        };

        info!(query = %query, generation, "list: searching users");
        let controller = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = controller
                .gateway
                .search_users(&query, 1, controller.options.page_size)
                .await;
            controller.apply_search_result(generation, &query, result);
        });
    }

    fn spawn_browse_fetch(self: &Arc<Self>, generation: u64, cursor: Option<UserId>) {
        info!(
            since = cursor.map(|id| id.0),
            per_page = self.options.page_size,
            generation,
            "list: fetching users page"
        );
        let controller = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = controller
                .gateway
                .fetch_users_page(cursor, controller.options.page_size)
                .await;
            controller.apply_browse_result(generation, result);
        });
    }

    fn apply_browse_result(&self, generation: u64, result: GatewayResult<Vec<UserSummary>>) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "list: discarding superseded page");
            return;
        }

        match result {
            Ok(page) => {
                let fetched = page.len();
                inner.pagination = inner.pagination.finish_page(page.last().map(|user| user.id));
                inner.items.extend(page);
                info!(
                    fetched,
                    total = inner.items.len(),
                    end_of_data = inner.pagination.end_of_data(),
                    "list: page loaded"
                );
                self.state.send_replace(ListState::Ready(inner.items.clone()));
            }
            Err(err) => self.publish_failure(&mut inner, &err),
        }
    }

    fn apply_search_result(&self, generation: u64, query: &str, result: GatewayResult<SearchPage>) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(query, generation, "list: discarding superseded search");
            return;
        }

        match result {
            Ok(page) => {
                info!(
                    query,
                    returned = page.items.len(),
                    total_count = page.total_count,
                    incomplete = page.incomplete_results,
                    "list: search loaded"
                );
                inner.pagination = inner.pagination.finish_search();
                inner.items = page.items;
                self.state.send_replace(ListState::Ready(inner.items.clone()));
            }
            Err(err) => self.publish_failure(&mut inner, &err),
        }
    }

    fn publish_failure(&self, inner: &mut ListInner, err: &TransportError) {
        let reason = err.reason_or(UNKNOWN_ERROR);
        warn!(
            searching = inner.pagination.is_searching(),
            "list: fetch failed: {reason}"
        );
        inner.pagination = inner.pagination.fail();
        inner.items.clear();
        self.state.send_replace(ListState::Failed(reason));
    }
}

impl Drop for UserListController {
    fn drop(&mut self) {
        self.debouncer.abort();
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
