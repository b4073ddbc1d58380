use serde::{Deserialize, Serialize};
use shelf_core::MediaCategory;

/// A search hit pointing at a detail page. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub title: String,
    pub detail_ref: String,
    pub source_id: Option<String>,
}

/// Normalized fields of one detail page. Only `media_type` is guaranteed;
/// every other field is absent when the page does not carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub media_type: MediaCategory,
    pub title: Option<String>,
    pub cover_url: Option<String>,
    pub douban_rating: Option<f32>,
    pub year: Option<i32>,
    pub summary: Option<String>,
    pub source_id: Option<String>,
    pub detail_url: Option<String>,

    // Movie
    pub director: Option<String>,
    pub cast: Option<String>,
    pub country: Option<String>,
    pub genres: Option<String>,
    pub imdb_id: Option<String>,
    pub duration: Option<String>,

    // Book
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub translator: Option<String>,
    pub pages: Option<u32>,
    pub pub_date: Option<String>,

    // Music
    pub performer: Option<String>,
    pub genre: Option<String>,
    pub media_format: Option<String>,
    pub release_date: Option<String>,
}

impl DetailRecord {
    pub fn empty(media_type: MediaCategory) -> Self {
        Self {
            media_type,
            title: None,
            cover_url: None,
            douban_rating: None,
            year: None,
            summary: None,
            source_id: None,
            detail_url: None,
            director: None,
            cast: None,
            country: None,
            genres: None,
            imdb_id: None,
            duration: None,
            author: None,
            isbn: None,
            publisher: None,
            translator: None,
            pages: None,
            pub_date: None,
            performer: None,
            genre: None,
            media_format: None,
            release_date: None,
        }
    }
}
