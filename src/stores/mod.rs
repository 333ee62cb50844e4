//! State stores consumed by the presentation layer.
//!
//! Each store exclusively owns its slice of state (search results, session,
//! favorites); cross-store reads are by value. Presentation triggers an
//! operation, the store flips its loading flag, calls out, and settles the
//! new snapshot.

pub mod auth;
pub mod favorites;
pub mod search;

pub use auth::{AuthStore, Session};
pub use favorites::{FavoritesState, FavoritesStore};
pub use search::{SearchState, SearchStore};
