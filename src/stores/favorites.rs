//! Favorites synchronizer.
//!
//! Mirrors the signed-in user's saved-book set between in-memory state and
//! the backend's favorites table. The backend is authoritative: duplicate
//! checks always go to it, and `fetch_all` overwrites rather than merges.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{DomainError, FavoriteRepository};
use crate::models::book::Book;
use crate::models::favorite::{BookSnapshot, FavoriteRecord};
use crate::notify::Notifier;
use crate::stores::auth::AuthStore;

#[derive(Debug, Clone, Default)]
pub struct FavoritesState {
    pub books: Vec<Book>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct FavoritesStore {
    repo: Arc<dyn FavoriteRepository>,
    auth: Arc<AuthStore>,
    state: RwLock<FavoritesState>,
    notifier: Notifier,
}

impl FavoritesStore {
    pub fn new(
        repo: Arc<dyn FavoriteRepository>,
        auth: Arc<AuthStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            repo,
            auth,
            state: RwLock::new(FavoritesState::default()),
            notifier,
        }
    }

    pub async fn snapshot(&self) -> FavoritesState {
        self.state.read().await.clone()
    }

    /// Save a book for the signed-in user, snapshotting its display
    /// attributes. The duplicate pre-check runs against the backend's current
    /// state, never the local copy; a lost race with a concurrent add comes
    /// back from the insert as a conflict and is reported the same way.
    pub async fn add(&self, book: &Book) -> Result<(), DomainError> {
        let Some(user) = self.auth.current_user().await else {
            return self
                .reject(DomainError::AuthRequired, "You must be logged in to save favorites")
                .await;
        };

        match self.repo.find(&user.id, &book.id).await {
            Ok(Some(_)) => {
                return self
                    .reject(DomainError::DuplicateFavorite, "Book is already in your favorites")
                    .await;
            }
            Ok(None) => {}
            Err(e) => return self.reject(e, "Failed to add to favorites").await,
        }

        let record = FavoriteRecord {
            user_id: user.id.clone(),
            book_id: book.id.clone(),
            book_data: BookSnapshot::from(book),
            created_at: None,
        };

        match self.repo.insert(&record).await {
            Ok(()) => {
                self.state.write().await.books.push(book.clone());
                self.notifier.success("Book added to favorites");
                Ok(())
            }
            Err(DomainError::DuplicateFavorite) => {
                self.reject(DomainError::DuplicateFavorite, "Book is already in your favorites")
                    .await
            }
            Err(e) => self.reject(e, "Failed to add to favorites").await,
        }
    }

    /// Remove a saved book by id. Removing an id that is not saved succeeds
    /// and changes nothing.
    pub async fn remove(&self, book_id: &str) -> Result<(), DomainError> {
        let Some(user) = self.auth.current_user().await else {
            return self
                .reject(DomainError::AuthRequired, "You must be logged in to manage favorites")
                .await;
        };

        match self.repo.delete(&user.id, book_id).await {
            Ok(()) => {
                self.state
                    .write()
                    .await
                    .books
                    .retain(|book| book.id != book_id);
                self.notifier.success("Book removed from favorites");
                Ok(())
            }
            Err(e) => self.reject(e, "Failed to remove from favorites").await,
        }
    }

    /// Replace the in-memory set with the backend's current records,
    /// rebuilding each book from its stored snapshot.
    pub async fn fetch_all(&self) -> Result<(), DomainError> {
        let Some(user) = self.auth.current_user().await else {
            return self
                .reject(DomainError::AuthRequired, "You must be logged in to view favorites")
                .await;
        };

        self.state.write().await.loading = true;

        match self.repo.list_for_user(&user.id).await {
            Ok(records) => {
                let books: Vec<Book> = records
                    .into_iter()
                    .map(|record| record.book_data.into_book())
                    .collect();
                tracing::debug!("Hydrated {} favorites for {}", books.len(), user.id);

                let mut state = self.state.write().await;
                state.books = books;
                state.loading = false;
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.state.write().await;
                    state.loading = false;
                }
                self.reject(e, "Failed to fetch favorites").await
            }
        }
    }

    async fn reject(&self, error: DomainError, notice: &str) -> Result<(), DomainError> {
        self.state.write().await.error = Some(error.to_string());
        self.notifier.error(notice);
        Err(error)
    }
}
