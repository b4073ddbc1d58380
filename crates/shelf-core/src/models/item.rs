use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectionStatus, MediaCategory};
use crate::error::{Result, ShelfError};

pub const MAX_RATING: f32 = 5.0;
pub const MAX_IMDB_RATING: f32 = 10.0;

/// A catalogued work plus the user's own annotations.
///
/// Catalogue fields are filled at import time and refreshed only by a
/// re-import; user fields change only through [`ItemPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    /// Assigned by storage; `None` until the item has been inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    pub media_type: MediaCategory,

    // External references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goodreads_id: Option<String>,

    // Cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_cover_path: Option<String>,

    // User-owned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_rating: Option<f32>,
    #[serde(default)]
    pub status: CollectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    // Shared catalogue details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub douban_rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<f32>,

    // Movie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<String>,

    // Book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator: Option<String>,

    // Music
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl CollectionItem {
    pub fn new(title: impl Into<String>, media_type: MediaCategory) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.into(),
            original_title: None,
            media_type,
            source_id: None,
            source_url: None,
            imdb_id: None,
            goodreads_id: None,
            cover_url: None,
            local_cover_path: None,
            my_rating: None,
            status: CollectionStatus::Wish,
            comment: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            year: None,
            summary: None,
            douban_rating: None,
            imdb_rating: None,
            director: None,
            cast: None,
            country: None,
            duration: None,
            genres: None,
            author: None,
            publisher: None,
            pub_date: None,
            isbn: None,
            pages: None,
            translator: None,
            performer: None,
            genre: None,
            media_format: None,
            release_date: None,
        }
    }

    /// Changes the status, keeping `completed_at` in step with `Done`.
    pub fn set_status(&mut self, status: CollectionStatus, now: DateTime<Utc>) {
        if status == self.status {
            return;
        }
        self.completed_at = match status {
            CollectionStatus::Done => Some(now),
            _ => None,
        };
        self.status = status;
    }

    /// Applies a user edit. Validation happens before any field changes.
    pub fn apply_patch(&mut self, patch: ItemPatch) -> Result<()> {
        if let Some(Some(rating)) = patch.my_rating {
            validate_rating(rating)?;
        }
        if let Some(Some(rating)) = patch.imdb_rating {
            validate_imdb_rating(rating)?;
        }

        let now = Utc::now();
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        if let Some(rating) = patch.my_rating {
            self.my_rating = rating;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(comment) = patch.comment {
            self.comment = non_empty(comment);
        }
        if let Some(isbn) = patch.isbn {
            self.isbn = non_empty(isbn);
        }
        if let Some(imdb_id) = patch.imdb_id {
            self.imdb_id = non_empty(imdb_id);
        }
        if let Some(source_id) = patch.source_id {
            self.source_id = non_empty(source_id);
        }
        if let Some(original_title) = patch.original_title {
            self.original_title = non_empty(original_title);
        }
        if let Some(goodreads_id) = patch.goodreads_id {
            self.goodreads_id = non_empty(goodreads_id);
        }
        if let Some(rating) = patch.imdb_rating {
            self.imdb_rating = rating;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Copies catalogue fields from a freshly imported item, leaving the
    /// user-owned fields and the creation time untouched.
    pub fn refresh_catalogue_fields(&mut self, fresh: &CollectionItem) {
        self.title = fresh.title.clone();
        self.original_title = fresh.original_title.clone().or(self.original_title.take());
        self.media_type = fresh.media_type;
        self.source_url = fresh.source_url.clone().or(self.source_url.take());
        self.imdb_id = fresh.imdb_id.clone().or(self.imdb_id.take());
        self.cover_url = fresh.cover_url.clone().or(self.cover_url.take());
        if fresh.local_cover_path.is_some() {
            self.local_cover_path = fresh.local_cover_path.clone();
        }
        self.year = fresh.year.or(self.year);
        self.summary = fresh.summary.clone();
        self.douban_rating = fresh.douban_rating;
        self.director = fresh.director.clone();
        self.cast = fresh.cast.clone();
        self.country = fresh.country.clone();
        self.duration = fresh.duration.clone();
        self.genres = fresh.genres.clone();
        self.author = fresh.author.clone();
        self.publisher = fresh.publisher.clone();
        self.pub_date = fresh.pub_date.clone();
        self.isbn = fresh.isbn.clone().or(self.isbn.take());
        self.pages = fresh.pages;
        self.translator = fresh.translator.clone();
        self.performer = fresh.performer.clone();
        self.genre = fresh.genre.clone();
        self.media_format = fresh.media_format.clone();
        self.release_date = fresh.release_date.clone();
        self.updated_at = Utc::now();
    }
}

/// A user edit. Outer `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub status: Option<CollectionStatus>,
    pub my_rating: Option<Option<f32>>,
    pub tags: Option<Vec<String>>,
    pub comment: Option<Option<String>>,
    pub isbn: Option<Option<String>>,
    pub imdb_id: Option<Option<String>>,
    pub source_id: Option<Option<String>>,
    pub original_title: Option<Option<String>>,
    pub goodreads_id: Option<Option<String>>,
    pub imdb_rating: Option<Option<f32>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.my_rating.is_none()
            && self.tags.is_none()
            && self.comment.is_none()
            && self.isbn.is_none()
            && self.imdb_id.is_none()
            && self.source_id.is_none()
            && self.original_title.is_none()
            && self.goodreads_id.is_none()
            && self.imdb_rating.is_none()
    }
}

pub fn validate_rating(rating: f32) -> Result<()> {
    if rating.is_finite() && (0.0..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ShelfError::Validation(format!(
            "rating must be between 0 and {MAX_RATING}, got {rating}"
        )))
    }
}

/// IMDb ratings use the site's own 0–10 scale.
pub fn validate_imdb_rating(rating: f32) -> Result<()> {
    if rating.is_finite() && (0.0..=MAX_IMDB_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ShelfError::Validation(format!(
            "IMDb rating must be between 0 and {MAX_IMDB_RATING}, got {rating}"
        )))
    }
}

/// Splits a free-text tag line on ASCII or full-width commas.
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(input.split([',', '，']).map(str::to_string))
}

fn normalize_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_defaults() {
        let item = CollectionItem::new("肖申克的救赎", MediaCategory::Movie);
        assert_eq!(item.status, CollectionStatus::Wish);
        assert!(item.id.is_none());
        assert!(item.tags.is_empty());
        assert!(item.my_rating.is_none());
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_done_sets_and_clears_completed_at() {
        let mut item = CollectionItem::new("活着", MediaCategory::Book);
        item.set_status(CollectionStatus::Done, Utc::now());
        assert!(item.completed_at.is_some());
        item.set_status(CollectionStatus::Doing, Utc::now());
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn test_patch_rejects_out_of_range_rating() {
        let mut item = CollectionItem::new("活着", MediaCategory::Book);
        let patch = ItemPatch {
            my_rating: Some(Some(5.5)),
            status: Some(CollectionStatus::Done),
            ..Default::default()
        };
        assert!(item.apply_patch(patch).is_err());
        // nothing applied
        assert_eq!(item.status, CollectionStatus::Wish);
    }

    #[test]
    fn test_patch_applies_and_clears() {
        let mut item = CollectionItem::new("OK Computer", MediaCategory::Music);
        item.comment = Some("old".into());
        let patch = ItemPatch {
            my_rating: Some(Some(4.5)),
            tags: Some(vec!["rock".into(), " rock ".into(), "90s".into()]),
            comment: Some(None),
            imdb_id: Some(Some("  ".into())),
            ..Default::default()
        };
        item.apply_patch(patch).unwrap();
        assert_eq!(item.my_rating, Some(4.5));
        assert_eq!(item.tags, vec!["rock", "90s"]);
        assert!(item.comment.is_none());
        assert!(item.imdb_id.is_none());
    }

    #[test]
    fn test_patch_sets_cross_reference_fields() {
        let mut item = CollectionItem::new("肖申克的救赎", MediaCategory::Movie);
        let patch = ItemPatch {
            original_title: Some(Some(" The Shawshank Redemption ".into())),
            goodreads_id: Some(Some("12345".into())),
            imdb_rating: Some(Some(9.3)),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        item.apply_patch(patch).unwrap();
        assert_eq!(item.original_title.as_deref(), Some("The Shawshank Redemption"));
        assert_eq!(item.goodreads_id.as_deref(), Some("12345"));
        assert_eq!(item.imdb_rating, Some(9.3));

        let bad = ItemPatch {
            imdb_rating: Some(Some(11.0)),
            goodreads_id: Some(None),
            ..Default::default()
        };
        assert!(item.apply_patch(bad).is_err());
        assert_eq!(item.goodreads_id.as_deref(), Some("12345"));

        let clear = ItemPatch {
            original_title: Some(None),
            imdb_rating: Some(None),
            ..Default::default()
        };
        item.apply_patch(clear).unwrap();
        assert!(item.original_title.is_none());
        assert!(item.imdb_rating.is_none());
    }

    #[test]
    fn test_parse_tags_handles_fullwidth_commas() {
        assert_eq!(parse_tags("经典, 剧情，美国,,"), vec!["经典", "剧情", "美国"]);
        assert!(parse_tags("  ").is_empty());
    }

    #[test]
    fn test_refresh_keeps_user_fields() {
        let mut stored = CollectionItem::new("Old title", MediaCategory::Movie);
        stored.id = Some(7);
        stored.my_rating = Some(4.0);
        stored.tags = vec!["fav".into()];
        stored.local_cover_path = Some("/covers/tt1.jpg".into());

        let mut fresh = CollectionItem::new("New title", MediaCategory::Movie);
        fresh.douban_rating = Some(9.7);

        stored.refresh_catalogue_fields(&fresh);
        assert_eq!(stored.id, Some(7));
        assert_eq!(stored.title, "New title");
        assert_eq!(stored.my_rating, Some(4.0));
        assert_eq!(stored.tags, vec!["fav"]);
        assert_eq!(stored.douban_rating, Some(9.7));
        assert_eq!(stored.local_cover_path.as_deref(), Some("/covers/tt1.jpg"));
    }
}
