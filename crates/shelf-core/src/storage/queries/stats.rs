use rusqlite::Connection;
use std::sync::MutexGuard;

use crate::error::Result;
use crate::models::{CollectionStats, CollectionStatus, MediaCategory, RecentItem};

const RECENT_LIMIT: i64 = 5;

/// Aggregate numbers over the whole collection. Rendering is left to callers.
pub struct CollectionStatsQuery<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> CollectionStatsQuery<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    pub fn get_stats(&self) -> Result<CollectionStats> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM collection_items", [], |row| {
                row.get::<_, i64>(0).map(|n| n as usize)
            })?;

        let average_rating: Option<f64> = self.conn.query_row(
            "SELECT AVG(my_rating) FROM collection_items WHERE my_rating IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let mut by_category = Vec::new();
        for category in MediaCategory::ALL {
            by_category.push((category, self.count_by_category(category)?));
        }

        let mut by_status = Vec::new();
        for status in CollectionStatus::ALL {
            by_status.push((status, self.count_by_status(status)?));
        }
        let done = by_status
            .iter()
            .find(|(s, _)| *s == CollectionStatus::Done)
            .map(|(_, n)| *n)
            .unwrap_or(0);

        Ok(CollectionStats {
            total,
            average_rating: average_rating.map(|avg| (avg * 10.0).round() / 10.0),
            done,
            by_category,
            by_status,
            by_year: self.count_by_year()?,
            recent: self.recent()?,
        })
    }

    pub fn count_by_category(&self, category: MediaCategory) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM collection_items WHERE media_type = ?1",
            rusqlite::params![category.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_by_status(&self, status: CollectionStatus) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM collection_items WHERE status = ?1",
            rusqlite::params![status.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_by_year(&self) -> Result<Vec<(i32, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, COUNT(*) FROM collection_items
             WHERE year IS NOT NULL
             GROUP BY year ORDER BY year",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn recent(&self) -> Result<Vec<RecentItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, media_type, status, created_at FROM collection_items
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([RECENT_LIMIT], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut recent = Vec::new();
        for row in rows {
            let (id, title, media_type, status, created_at) = row?;
            let (Ok(media_type), Ok(created_at)) = (
                media_type.parse::<MediaCategory>(),
                chrono::DateTime::parse_from_rfc3339(&created_at),
            ) else {
                continue;
            };
            recent.push(RecentItem {
                id,
                title,
                media_type,
                status: status.parse().unwrap_or_default(),
                created_at: created_at.with_timezone(&chrono::Utc),
            });
        }
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CollectionItem;
    use crate::storage::database::{run_migrations, ConnectionPool};
    use crate::storage::repositories::{ItemRepository, SqliteItemRepository};

    #[test]
    fn test_stats_over_small_collection() {
        let pool = ConnectionPool::open_in_memory().unwrap();
        run_migrations(&pool.get_connection()).unwrap();

        {
            let repo = SqliteItemRepository::new(pool.get_connection());
            let mut a = CollectionItem::new("A", MediaCategory::Movie);
            a.year = Some(1994);
            a.my_rating = Some(5.0);
            a.set_status(CollectionStatus::Done, chrono::Utc::now());
            repo.insert(&a).unwrap();

            let mut b = CollectionItem::new("B", MediaCategory::Movie);
            b.year = Some(1994);
            b.my_rating = Some(4.0);
            repo.insert(&b).unwrap();

            let mut c = CollectionItem::new("C", MediaCategory::Book);
            c.year = Some(2012);
            repo.insert(&c).unwrap();
        }

        let stats = CollectionStatsQuery::new(pool.get_connection()).get_stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.average_rating, Some(4.5));
        assert_eq!(stats.by_year, vec![(1994, 2), (2012, 1)]);
        assert!(stats.by_category.contains(&(MediaCategory::Movie, 2)));
        assert!(stats.by_category.contains(&(MediaCategory::Music, 0)));
        assert_eq!(stats.recent.len(), 3);
        assert_eq!(stats.recent[0].title, "C");
    }

    #[test]
    fn test_stats_on_empty_collection() {
        let pool = ConnectionPool::open_in_memory().unwrap();
        run_migrations(&pool.get_connection()).unwrap();
        let stats = CollectionStatsQuery::new(pool.get_connection()).get_stats().unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.average_rating.is_none());
        assert!(stats.by_year.is_empty());
    }
}
