use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::models::track::{Track, TrackSearchResponse};

const TRACK_LIMIT: u32 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Track search against the streaming catalog. Authentication runs through
/// the local token proxy so the provider credentials never reach this side.
pub struct StreamingClient {
    http: reqwest::Client,
    token_url: String,
    api_base: String,
}

impl StreamingClient {
    pub fn new(
        token_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::CatalogUnavailable(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            token_url: token_url.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch an access token from the proxy. A response without a token is
    /// fatal for the current streaming action.
    pub async fn fetch_token(&self) -> Result<String, DomainError> {
        let resp = self.http.get(&self.token_url).send().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to reach token proxy: {}", e))
        })?;

        if !resp.status().is_success() {
            return Err(DomainError::CatalogUnavailable(format!(
                "Token proxy returned status: {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp.json().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to parse token response: {}", e))
        })?;

        token.access_token.ok_or(DomainError::TokenMissing)
    }

    /// Search tracks with an already-fetched bearer token.
    pub async fn search_tracks(
        &self,
        query: &str,
        token: &str,
    ) -> Result<Vec<Track>, DomainError> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_base,
            urlencoding::encode(query),
            TRACK_LIMIT
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                DomainError::CatalogUnavailable(format!("Failed to send request: {}", e))
            })?;

        if !resp.status().is_success() {
            return Err(DomainError::CatalogUnavailable(format!(
                "Streaming search returned status: {}",
                resp.status()
            )));
        }

        let parsed: TrackSearchResponse = resp.json().await.map_err(|e| {
            DomainError::CatalogUnavailable(format!("Failed to parse JSON: {}", e))
        })?;

        Ok(parsed.tracks.items)
    }

    /// Token fetch and search in one step.
    pub async fn search(&self, query: &str) -> Result<Vec<Track>, DomainError> {
        let token = self.fetch_token().await?;
        self.search_tracks(query, &token).await
    }
}
