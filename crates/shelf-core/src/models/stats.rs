use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectionStatus, MediaCategory};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total: usize,
    /// Mean of the user's own ratings; `None` when nothing is rated.
    pub average_rating: Option<f64>,
    pub done: usize,
    pub by_category: Vec<(MediaCategory, usize)>,
    pub by_status: Vec<(CollectionStatus, usize)>,
    /// Ascending by year. Items without a year are left out.
    pub by_year: Vec<(i32, usize)>,
    pub recent: Vec<RecentItem>,
}

/// Lightweight row for "recently added" listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentItem {
    pub id: i64,
    pub title: String,
    pub media_type: MediaCategory,
    pub status: CollectionStatus,
    pub created_at: DateTime<Utc>,
}
