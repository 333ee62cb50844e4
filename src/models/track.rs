use serde::{Deserialize, Serialize};

/// Subset of the streaming provider's track search payload that the app
/// displays: track name, artists, album art and the external/preview links.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Album,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<AlbumImage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrackSearchResponse {
    pub tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<Track>,
}
