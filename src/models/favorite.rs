use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::book::{Book, ImageLinks, IndustryIdentifier, VolumeInfo};

/// Denormalized copy of a book's display attributes, captured when the
/// favorite is added. A stale-tolerant snapshot, not a foreign key: later
/// changes to the catalog entry never update a stored favorite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSnapshot {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub average_rating: Option<f32>,
    #[serde(default)]
    pub ratings_count: u32,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub industry_identifiers: Vec<IndustryIdentifier>,
}

/// One row of the backend's per-user favorites table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: String,
    pub book_id: String,
    pub book_data: BookSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Book> for BookSnapshot {
    fn from(book: &Book) -> Self {
        let info = &book.volume_info;
        Self {
            id: book.id.clone(),
            title: info.title.clone(),
            authors: info.authors.clone().unwrap_or_default(),
            description: info.description.clone().unwrap_or_default(),
            thumbnail: book.thumbnail().unwrap_or_default().to_string(),
            published_date: info.published_date.clone().unwrap_or_default(),
            page_count: info.page_count.unwrap_or_default(),
            categories: info.categories.clone().unwrap_or_default(),
            publisher: info.publisher.clone().unwrap_or_default(),
            average_rating: info.average_rating,
            ratings_count: info.ratings_count.unwrap_or_default(),
            language: info.language.clone().unwrap_or_default(),
            industry_identifiers: info.industry_identifiers.clone().unwrap_or_default(),
        }
    }
}

impl BookSnapshot {
    /// Rebuild a displayable `Book` from the stored attributes. Fields the
    /// snapshot stored as empty come back as `None`.
    pub fn into_book(self) -> Book {
        fn non_empty(s: String) -> Option<String> {
            if s.is_empty() { None } else { Some(s) }
        }

        let image_links = non_empty(self.thumbnail).map(|thumbnail| ImageLinks {
            thumbnail: Some(thumbnail),
            small_thumbnail: None,
        });

        Book {
            id: self.id,
            volume_info: VolumeInfo {
                title: self.title,
                authors: (!self.authors.is_empty()).then_some(self.authors),
                published_date: non_empty(self.published_date),
                description: non_empty(self.description),
                page_count: (self.page_count > 0).then_some(self.page_count),
                categories: (!self.categories.is_empty()).then_some(self.categories),
                image_links,
                publisher: non_empty(self.publisher),
                industry_identifiers: (!self.industry_identifiers.is_empty())
                    .then_some(self.industry_identifiers),
                average_rating: self.average_rating,
                ratings_count: (self.ratings_count > 0).then_some(self.ratings_count),
                language: non_empty(self.language),
            },
        }
    }
}
