//! REST client for the hosted identity/data backend.
//!
//! Two sub-APIs share one base URL: session auth under `auth/v1` and the
//! per-user favorites table under `rest/v1`. The current session's access
//! token lives here, in memory only; a restart re-derives it through
//! `current_user`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::domain::{DomainError, FavoriteRepository, IdentityBackend};
use crate::models::favorite::FavoriteRecord;
use crate::models::user::User;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct AuthSession {
    access_token: String,
    user: BackendUser,
}

#[derive(Debug, Deserialize)]
struct BackendUser {
    id: String,
    email: String,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    username: Option<String>,
}

impl From<BackendUser> for User {
    fn from(u: BackendUser) -> Self {
        User {
            id: u.id,
            email: u.email,
            username: u.user_metadata.username,
        }
    }
}

/// Error body shape varies between the auth and data sub-APIs.
#[derive(Debug, Deserialize)]
struct BackendError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl BackendClient {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, DomainError> {
        let mut base = base_url.to_string();
        // Url::join treats a base without a trailing slash as a file path
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| DomainError::PersistenceUnavailable(format!("Invalid backend URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                DomainError::PersistenceUnavailable(format!("Failed to build client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.into(),
            access_token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DomainError> {
        self.base_url
            .join(path)
            .map_err(|e| DomainError::PersistenceUnavailable(format!("Invalid endpoint: {}", e)))
    }

    async fn session_token(&self) -> Result<String, DomainError> {
        self.access_token
            .read()
            .await
            .clone()
            .ok_or(DomainError::AuthRequired)
    }

    /// Pull the backend's own message out of an error response, falling back
    /// to the status line.
    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        match resp.json::<BackendError>().await {
            Ok(body) => body
                .error_description
                .or(body.msg)
                .or(body.message)
                .unwrap_or_else(|| format!("Backend returned status: {}", status)),
            Err(_) => format!("Backend returned status: {}", status),
        }
    }

    async fn open_session(&self, resp: reqwest::Response) -> Result<User, DomainError> {
        let session: AuthSession = resp
            .json()
            .await
            .map_err(|e| DomainError::AuthFailed(format!("Failed to parse session: {}", e)))?;

        *self.access_token.write().await = Some(session.access_token);
        Ok(session.user.into())
    }

    fn favorites_url(&self, user_id: &str, book_id: Option<&str>) -> Result<Url, DomainError> {
        let mut url = self.endpoint("rest/v1/favorites")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("user_id", &format!("eq.{}", user_id));
            if let Some(book_id) = book_id {
                pairs.append_pair("book_id", &format!("eq.{}", book_id));
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl IdentityBackend for BackendClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.set_query(Some("grant_type=password"));

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| DomainError::AuthFailed(format!("Failed to reach backend: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::AuthFailed(Self::error_message(resp).await));
        }

        self.open_session(resp).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<User, DomainError> {
        let url = self.endpoint("auth/v1/signup")?;

        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(username) = username {
            body["data"] = serde_json::json!({ "username": username });
        }

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::AuthFailed(format!("Failed to reach backend: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::AuthFailed(Self::error_message(resp).await));
        }

        self.open_session(resp).await
    }

    async fn sign_out(&self) -> Result<(), DomainError> {
        let Some(token) = self.access_token.read().await.clone() else {
            return Ok(());
        };

        let url = self.endpoint("auth/v1/logout")?;
        let resp = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| DomainError::AuthFailed(format!("Failed to reach backend: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::AuthFailed(Self::error_message(resp).await));
        }

        *self.access_token.write().await = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, DomainError> {
        let Some(token) = self.access_token.read().await.clone() else {
            return Ok(None);
        };

        let url = self.endpoint("auth/v1/user")?;
        let resp = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| DomainError::AuthFailed(format!("Failed to reach backend: {}", e)))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Session expired or revoked; drop the stale token.
            *self.access_token.write().await = None;
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(DomainError::AuthFailed(Self::error_message(resp).await));
        }

        let user: BackendUser = resp
            .json()
            .await
            .map_err(|e| DomainError::AuthFailed(format!("Failed to parse user: {}", e)))?;

        Ok(Some(user.into()))
    }
}

#[async_trait]
impl FavoriteRepository for BackendClient {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteRecord>, DomainError> {
        let token = self.session_token().await?;
        let mut url = self.favorites_url(user_id, None)?;
        url.query_pairs_mut()
            .append_pair("select", "user_id,book_id,book_data,created_at");

        let resp = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                DomainError::PersistenceUnavailable(format!("Failed to reach backend: {}", e))
            })?;

        if !resp.status().is_success() {
            return Err(DomainError::PersistenceUnavailable(
                Self::error_message(resp).await,
            ));
        }

        resp.json().await.map_err(|e| {
            DomainError::PersistenceUnavailable(format!("Failed to parse records: {}", e))
        })
    }

    async fn find(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> Result<Option<FavoriteRecord>, DomainError> {
        let token = self.session_token().await?;
        let mut url = self.favorites_url(user_id, Some(book_id))?;
        url.query_pairs_mut()
            .append_pair("select", "user_id,book_id,book_data,created_at")
            .append_pair("limit", "1");

        let resp = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                DomainError::PersistenceUnavailable(format!("Failed to reach backend: {}", e))
            })?;

        if !resp.status().is_success() {
            return Err(DomainError::PersistenceUnavailable(
                Self::error_message(resp).await,
            ));
        }

        let mut records: Vec<FavoriteRecord> = resp.json().await.map_err(|e| {
            DomainError::PersistenceUnavailable(format!("Failed to parse records: {}", e))
        })?;

        Ok(records.pop())
    }

    async fn insert(&self, record: &FavoriteRecord) -> Result<(), DomainError> {
        let token = self.session_token().await?;
        let url = self.endpoint("rest/v1/favorites")?;

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(&token)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                DomainError::PersistenceUnavailable(format!("Failed to reach backend: {}", e))
            })?;

        // Uniqueness on (user_id, book_id) is enforced server-side; a lost
        // duplicate-check race comes back as a conflict.
        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Err(DomainError::DuplicateFavorite);
        }
        if !resp.status().is_success() {
            return Err(DomainError::PersistenceUnavailable(
                Self::error_message(resp).await,
            ));
        }

        Ok(())
    }

    async fn delete(&self, user_id: &str, book_id: &str) -> Result<(), DomainError> {
        let token = self.session_token().await?;
        let url = self.favorites_url(user_id, Some(book_id))?;

        let resp = self
            .http
            .delete(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                DomainError::PersistenceUnavailable(format!("Failed to reach backend: {}", e))
            })?;

        if !resp.status().is_success() {
            return Err(DomainError::PersistenceUnavailable(
                Self::error_message(resp).await,
            ));
        }

        Ok(())
    }
}
