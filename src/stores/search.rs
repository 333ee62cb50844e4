//! Search/browse state store.
//!
//! Owns the current result list and the detail-view book. All operations are
//! async and re-entrant; concurrent calls are resolved last-issued-wins via a
//! per-slot sequence counter, so a slow response can never overwrite the
//! state of a newer request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::domain::DomainError;
use crate::integrations::google_books::{CatalogClient, DEFAULT_PAGE_SIZE};
use crate::models::book::Book;
use crate::notify::Notifier;

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Locally held prefix of the full remote result set
    pub books: Vec<Book>,
    /// Detail-view slot, independent of the result list
    pub current_book: Option<Book>,
    pub query: String,
    /// The catalog's declared total match count for the current query
    pub total_items: u32,
    pub loading: bool,
    pub detail_loading: bool,
    pub error: Option<String>,
}

impl SearchState {
    pub fn has_more(&self) -> bool {
        (self.books.len() as u32) < self.total_items
    }
}

pub struct SearchStore {
    catalog: Arc<CatalogClient>,
    state: RwLock<SearchState>,
    /// Sequence for operations that own the result list
    list_seq: AtomicU64,
    /// Sequence for the detail slot
    detail_seq: AtomicU64,
    notifier: Notifier,
    page_size: u32,
}

impl SearchStore {
    pub fn new(catalog: Arc<CatalogClient>, notifier: Notifier) -> Self {
        Self {
            catalog,
            state: RwLock::new(SearchState::default()),
            list_seq: AtomicU64::new(0),
            detail_seq: AtomicU64::new(0),
            notifier,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn snapshot(&self) -> SearchState {
        self.state.read().await.clone()
    }

    /// Fresh keyword search. Replaces the held results; a failure leaves the
    /// list empty rather than showing stale partial results.
    pub async fn search(&self, query: &str) -> Result<(), DomainError> {
        let ticket = self.next_list_ticket();
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
            state.query = query.to_string();
        }

        tracing::debug!("Searching catalog for {:?}", query);
        let result = self
            .catalog
            .search_by_keyword(query, 0, self.page_size)
            .await;

        let mut state = self.state.write().await;
        if self.stale_list(ticket) {
            tracing::debug!("Discarding superseded search result for {:?}", query);
            return Ok(());
        }

        match result {
            Ok(page) => {
                state.books = page.items;
                state.total_items = page.total_items;
                state.loading = false;
                Ok(())
            }
            Err(e) => {
                state.books.clear();
                state.total_items = 0;
                state.loading = false;
                state.error = Some(e.to_string());
                drop(state);
                self.notifier.error("Failed to search books");
                Err(e)
            }
        }
    }

    /// Fetch the next page of the current query and append it. Never
    /// reorders or truncates what is already held.
    pub async fn load_more(&self, start_index: u32) -> Result<(), DomainError> {
        let ticket = self.next_list_ticket();
        let query = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.query.clone()
        };

        let result = self
            .catalog
            .search_by_keyword(&query, start_index, self.page_size)
            .await;

        let mut state = self.state.write().await;
        if self.stale_list(ticket) {
            return Ok(());
        }

        match result {
            Ok(page) => {
                state.books.extend(page.items);
                state.loading = false;
                Ok(())
            }
            Err(e) => {
                state.loading = false;
                state.error = Some(e.to_string());
                drop(state);
                self.notifier.error("Failed to load more books");
                Err(e)
            }
        }
    }

    /// Replace the held results with a subject-filtered listing. Leaves the
    /// current query untouched.
    pub async fn by_category(&self, category: &str) -> Result<(), DomainError> {
        let ticket = self.next_list_ticket();
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let result = self
            .catalog
            .search_by_category(category, 0, self.page_size)
            .await;

        self.resolve_listing(ticket, result, "Failed to fetch books by category")
            .await
    }

    /// Replace the held results with the newest publications shelf.
    pub async fn newest(&self) -> Result<(), DomainError> {
        let ticket = self.next_list_ticket();
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let result = self.catalog.fetch_newest(self.page_size).await;

        self.resolve_listing(ticket, result, "Failed to fetch newest books")
            .await
    }

    /// Load one volume into the detail slot.
    pub async fn fetch_by_id(&self, id: &str) -> Result<(), DomainError> {
        let ticket = self.detail_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write().await;
            state.detail_loading = true;
            state.error = None;
            state.current_book = None;
        }

        let result = self.catalog.fetch_by_id(id).await;

        let mut state = self.state.write().await;
        if self.detail_seq.load(Ordering::SeqCst) != ticket {
            return Ok(());
        }

        match result {
            Ok(book) => {
                state.current_book = Some(book);
                state.detail_loading = false;
                Ok(())
            }
            Err(e) => {
                state.detail_loading = false;
                state.error = Some(e.to_string());
                drop(state);
                self.notifier.error("Failed to fetch book details");
                Err(e)
            }
        }
    }

    pub async fn set_query(&self, query: &str) {
        self.state.write().await.query = query.to_string();
    }

    /// Reset the result list and query. Also invalidates any in-flight
    /// listing request so a late response cannot repopulate the list.
    pub async fn clear(&self) {
        self.next_list_ticket();
        let mut state = self.state.write().await;
        state.query.clear();
        state.books.clear();
        state.total_items = 0;
    }

    fn next_list_ticket(&self) -> u64 {
        self.list_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn stale_list(&self, ticket: u64) -> bool {
        self.list_seq.load(Ordering::SeqCst) != ticket
    }

    async fn resolve_listing(
        &self,
        ticket: u64,
        result: Result<crate::models::book::VolumePage, DomainError>,
        failure_notice: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if self.stale_list(ticket) {
            return Ok(());
        }

        match result {
            Ok(page) => {
                state.books = page.items;
                state.total_items = page.total_items;
                state.loading = false;
                Ok(())
            }
            Err(e) => {
                state.books.clear();
                state.total_items = 0;
                state.loading = false;
                state.error = Some(e.to_string());
                drop(state);
                self.notifier.error(failure_notice);
                Err(e)
            }
        }
    }
}
