use std::path::Path;

use shelf_core::{CollectionItem, CollectionStatus};

use crate::error::{Result, ScrapeError};
use crate::types::{DetailRecord, SearchCandidate};

/// Builds a fresh collection item: status `Wish`, no user annotations.
/// The detail's title wins; the candidate's is the fallback. The
/// candidate's catalogue id wins; the detail's is the fallback.
pub fn assemble(
    candidate: &SearchCandidate,
    detail: &DetailRecord,
    local_cover_path: Option<&Path>,
) -> CollectionItem {
    let title = detail
        .title
        .clone()
        .unwrap_or_else(|| candidate.title.trim().to_string());
    let mut item = item_from_detail(title, detail, local_cover_path);
    item.source_id = candidate
        .source_id
        .clone()
        .or_else(|| detail.source_id.clone());
    if item.source_url.is_none() {
        item.source_url = Some(candidate.detail_ref.clone());
    }
    item
}

/// Same as [`assemble`] for a detail fetched straight from a URL.
pub fn assemble_from_detail(
    detail: &DetailRecord,
    local_cover_path: Option<&Path>,
) -> Result<CollectionItem> {
    let title = detail.title.clone().ok_or(ScrapeError::MissingTitle)?;
    let mut item = item_from_detail(title, detail, local_cover_path);
    item.source_id = detail.source_id.clone();
    Ok(item)
}

fn item_from_detail(
    title: String,
    detail: &DetailRecord,
    local_cover_path: Option<&Path>,
) -> CollectionItem {
    let mut item = CollectionItem::new(title, detail.media_type);
    item.status = CollectionStatus::Wish;
    item.source_url = detail.detail_url.clone();
    item.imdb_id = detail.imdb_id.clone();
    item.cover_url = detail.cover_url.clone();
    item.local_cover_path = local_cover_path.map(|p| p.to_string_lossy().to_string());
    item.year = detail.year;
    item.summary = detail.summary.clone();
    item.douban_rating = detail.douban_rating;

    item.director = detail.director.clone();
    item.cast = detail.cast.clone();
    item.country = detail.country.clone();
    item.genres = detail.genres.clone();
    item.duration = detail.duration.clone();

    item.author = detail.author.clone();
    item.isbn = detail.isbn.clone();
    item.publisher = detail.publisher.clone();
    item.translator = detail.translator.clone();
    item.pages = detail.pages;
    item.pub_date = detail.pub_date.clone();

    item.performer = detail.performer.clone();
    item.genre = detail.genre.clone();
    item.media_format = detail.media_format.clone();
    item.release_date = detail.release_date.clone();
    item
}
