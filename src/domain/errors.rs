//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Catalog or streaming call did not complete (network failure or non-2xx)
    CatalogUnavailable(String),
    /// The catalog reports the requested id unknown
    NotFound,
    /// The identity backend rejected credentials or a session operation
    AuthFailed(String),
    /// A favorites operation was attempted without a signed-in user
    AuthRequired,
    /// The book is already in the user's favorites
    DuplicateFavorite,
    /// Backend data-table call failed
    PersistenceUnavailable(String),
    /// The token proxy did not return an access token
    TokenMissing,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::CatalogUnavailable(msg) => write!(f, "Catalog unavailable: {}", msg),
            DomainError::NotFound => write!(f, "Not found"),
            DomainError::AuthFailed(msg) => write!(f, "Authentication failed: {}", msg),
            DomainError::AuthRequired => write!(f, "You must be logged in to manage favorites"),
            DomainError::DuplicateFavorite => write!(f, "Book is already in your favorites"),
            DomainError::PersistenceUnavailable(msg) => {
                write!(f, "Persistence unavailable: {}", msg)
            }
            DomainError::TokenMissing => write!(f, "Failed to retrieve streaming access token"),
        }
    }
}

impl std::error::Error for DomainError {}
