use std::time::Duration;

use crate::domain::DomainError;
use crate::models::book::{Book, VolumePage};

/// Pagination window when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Subject filter backing the "newest" shelf on the home page.
const NEWEST_SUBJECT: &str = "fiction";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only client for the external book catalog.
///
/// Every call is a live upstream request: no caching, no retries. A failed
/// attempt surfaces immediately as `CatalogUnavailable`.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::CatalogUnavailable(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Free-text relevance search over the whole catalog.
    pub async fn search_by_keyword(
        &self,
        query: &str,
        start: u32,
        size: u32,
    ) -> Result<VolumePage, DomainError> {
        let url = format!(
            "{}?q={}&startIndex={}&maxResults={}{}",
            self.base_url,
            urlencoding::encode(query),
            start,
            size,
            self.key_param()
        );
        self.fetch_page(&url).await
    }

    /// Search filtered to a single subject label.
    pub async fn search_by_category(
        &self,
        category: &str,
        start: u32,
        size: u32,
    ) -> Result<VolumePage, DomainError> {
        let url = format!(
            "{}?q=subject:{}&startIndex={}&maxResults={}{}",
            self.base_url,
            urlencoding::encode(category),
            start,
            size,
            self.key_param()
        );
        self.fetch_page(&url).await
    }

    /// Newest publications first, scoped to the default subject.
    pub async fn fetch_newest(&self, size: u32) -> Result<VolumePage, DomainError> {
        let url = format!(
            "{}?q=subject:{}&orderBy=newest&maxResults={}{}",
            self.base_url,
            NEWEST_SUBJECT,
            size,
            self.key_param()
        );
        self.fetch_page(&url).await
    }

    /// Fetch a single volume. An id the catalog does not know is `NotFound`.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Book, DomainError> {
        let key = self
            .api_key
            .as_ref()
            .map(|k| format!("?key={}", k))
            .unwrap_or_default();
        let url = format!("{}/{}{}", self.base_url, urlencoding::encode(id), key);

        let resp = self.http.get(&url).send().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to send request: {}", e))
        })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DomainError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(DomainError::CatalogUnavailable(format!(
                "Catalog returned status: {}",
                resp.status()
            )));
        }

        let body = resp.text().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to read response body: {}", e))
        })?;

        serde_json::from_str(&body)
            .map_err(|e| DomainError::CatalogUnavailable(format!("Failed to parse JSON: {}", e)))
    }

    fn key_param(&self) -> String {
        self.api_key
            .as_ref()
            .map(|k| format!("&key={}", k))
            .unwrap_or_default()
    }

    async fn fetch_page(&self, url: &str) -> Result<VolumePage, DomainError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to send request: {}", e))
        })?;

        if !resp.status().is_success() {
            return Err(DomainError::CatalogUnavailable(format!(
                "Catalog returned status: {}",
                resp.status()
            )));
        }

        let body = resp.text().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to read response body: {}", e))
        })?;

        serde_json::from_str(&body)
            .map_err(|e| DomainError::CatalogUnavailable(format!("Failed to parse JSON: {}", e)))
    }
}
