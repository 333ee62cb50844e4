use serde::{Deserialize, Serialize};

/// A single volume as returned by the catalog. The `id` is catalog-assigned
/// and immutable; everything else is a read-only snapshot at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    #[serde(rename = "volumeInfo")]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    /// Partial ISO date: the catalog sends "2001", "2001-05" or "2001-05-17".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_links: Option<ImageLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    // smallThumbnail is also available but often too small
    #[serde(rename = "smallThumbnail", skip_serializing_if = "Option::is_none")]
    pub small_thumbnail: Option<String>,
}

/// An (identifier-type, identifier-value) pair, e.g. ISBN_10 / ISBN_13.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

/// One page of catalog results. `total_items` is the catalog's declared match
/// count and may exceed the number of items actually held here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumePage {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub items: Vec<Book>,
}

impl Book {
    pub fn thumbnail(&self) -> Option<&str> {
        self.volume_info
            .image_links
            .as_ref()
            .and_then(|links| links.thumbnail.as_deref())
    }
}
