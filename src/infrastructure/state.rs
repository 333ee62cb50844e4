//! Application wiring: config in, stores out.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::domain::{DomainError, FavoriteRepository, IdentityBackend};
use crate::infrastructure::backend::BackendClient;
use crate::integrations::{CatalogClient, StreamingClient};
use crate::notify::{Notice, Notifier};
use crate::stores::{AuthStore, FavoritesStore, SearchStore};

/// The assembled state/data layer. The presentation layer holds one of these
/// and talks only to the stores (plus the streaming client for the track
/// search side feature).
pub struct App {
    pub search: Arc<SearchStore>,
    pub auth: Arc<AuthStore>,
    pub favorites: Arc<FavoritesStore>,
    pub streaming: Arc<StreamingClient>,
    notifier: Notifier,
}

impl App {
    pub fn new(config: &Config) -> Result<Self, DomainError> {
        let notifier = Notifier::default();

        let catalog = Arc::new(CatalogClient::new(
            &config.catalog_base_url,
            config.catalog_api_key.clone(),
        )?);
        let backend = Arc::new(BackendClient::new(
            &config.backend_url,
            config.backend_anon_key.clone(),
        )?);
        let streaming = Arc::new(StreamingClient::new(
            &config.token_proxy_url,
            &config.streaming_api_url,
        )?);

        let identity: Arc<dyn IdentityBackend> = backend.clone();
        let favorites_repo: Arc<dyn FavoriteRepository> = backend;

        let auth = Arc::new(AuthStore::new(identity, notifier.clone()));
        let favorites = Arc::new(FavoritesStore::new(
            favorites_repo,
            auth.clone(),
            notifier.clone(),
        ));
        let search = Arc::new(SearchStore::new(catalog, notifier.clone()));

        Ok(Self {
            search,
            auth,
            favorites,
            streaming,
            notifier,
        })
    }

    /// Subscribe to the user-facing notices every store emits.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }
}
