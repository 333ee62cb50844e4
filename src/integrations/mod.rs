//! Clients for the external REST services the app reads from.

pub mod google_books;
pub mod spotify;

pub use google_books::CatalogClient;
pub use spotify::StreamingClient;
