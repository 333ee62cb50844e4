//! Repository trait definitions
//!
//! These traits define the contract for the hosted identity/data backend.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::DomainError;
use crate::models::favorite::FavoriteRecord;
use crate::models::user::User;

/// Session-based auth against the identity backend.
///
/// Session token persistence is the backend client's concern; callers only
/// see the resolved `User`.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Exchange credentials for a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, DomainError>;

    /// Provision a new account and open a session for it
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<User, DomainError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), DomainError>;

    /// Resolve the user behind the current session, if any.
    ///
    /// "No valid session" is `Ok(None)`, not an error.
    async fn current_user(&self) -> Result<Option<User>, DomainError>;
}

/// Per-user favorites table keyed by (user id, book id).
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// All favorite records for a user
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteRecord>, DomainError>;

    /// Look up a single (user, book) record
    async fn find(&self, user_id: &str, book_id: &str)
    -> Result<Option<FavoriteRecord>, DomainError>;

    /// Insert a new record. The backend enforces (user_id, book_id)
    /// uniqueness; a conflict surfaces as `DomainError::DuplicateFavorite`.
    async fn insert(&self, record: &FavoriteRecord) -> Result<(), DomainError>;

    /// Delete the (user, book) record. Deleting an absent record succeeds.
    async fn delete(&self, user_id: &str, book_id: &str) -> Result<(), DomainError>;
}
