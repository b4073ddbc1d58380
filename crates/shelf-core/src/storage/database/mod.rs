mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{get_applied_versions, run_migrations, Migration};
pub use schema::SCHEMA_VERSION;

use std::path::Path;

use tracing::debug;

use crate::error::{Result, ShelfError};
use crate::models::{CollectionItem, CollectionStats, ItemPatch};

use super::queries::CollectionStatsQuery;
use super::repositories::{ItemFilter, ItemRepository, Repository, SqliteItemRepository};

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    debug!(path = %path.display(), "collection database opened");
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// Entry point for everything that reads or writes the collection.
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    fn items(&self) -> SqliteItemRepository<'_> {
        SqliteItemRepository::new(self.pool.get_connection())
    }

    /// Stores a new item and returns the id storage assigned to it.
    pub fn insert_item(&self, item: &CollectionItem) -> Result<i64> {
        self.items().insert(item)
    }

    pub fn update_item(&self, item: &CollectionItem) -> Result<()> {
        self.items().update(item)
    }

    pub fn get_item(&self, id: i64) -> Result<CollectionItem> {
        self.items()
            .find_by_id(&id)?
            .ok_or(ShelfError::ItemNotFound(id))
    }

    pub fn find_by_source_id(&self, source_id: &str) -> Result<Option<CollectionItem>> {
        self.items().find_by_source_id(source_id)
    }

    pub fn delete_item(&self, id: i64) -> Result<()> {
        if !self.items().delete(&id)? {
            return Err(ShelfError::ItemNotFound(id));
        }
        Ok(())
    }

    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<CollectionItem>> {
        self.items().list(filter)
    }

    pub fn count_items(&self, filter: &ItemFilter) -> Result<usize> {
        self.items().count(filter)
    }

    /// Loads an item, applies a user edit and writes it back.
    pub fn apply_patch(&self, id: i64, patch: ItemPatch) -> Result<CollectionItem> {
        let repo = self.items();
        let mut item = repo.find_by_id(&id)?.ok_or(ShelfError::ItemNotFound(id))?;
        item.apply_patch(patch)?;
        repo.update(&item)?;
        Ok(item)
    }

    pub fn set_cover_path(&self, id: i64, path: Option<&str>) -> Result<()> {
        self.items().set_cover_path(id, path)
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        CollectionStatsQuery::new(self.pool.get_connection()).get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionStatus, MediaCategory};
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file_and_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("collection.db");

        let id = {
            let db = Database::open(&path).unwrap();
            db.insert_item(&CollectionItem::new("Persisted", MediaCategory::Book))
                .unwrap()
        };
        assert!(path.exists());

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_item(id).unwrap().title, "Persisted");
    }

    #[test]
    fn test_apply_patch_validates_before_writing() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert_item(&CollectionItem::new("Rated", MediaCategory::Movie))
            .unwrap();

        let bad = ItemPatch {
            my_rating: Some(Some(7.5)),
            status: Some(CollectionStatus::Done),
            ..Default::default()
        };
        assert!(matches!(db.apply_patch(id, bad), Err(ShelfError::Validation(_))));
        let stored = db.get_item(id).unwrap();
        assert_eq!(stored.status, CollectionStatus::Wish);
        assert!(stored.my_rating.is_none());

        let good = ItemPatch {
            my_rating: Some(Some(4.5)),
            status: Some(CollectionStatus::Done),
            ..Default::default()
        };
        let updated = db.apply_patch(id, good).unwrap();
        assert_eq!(updated.my_rating, Some(4.5));
        assert!(db.get_item(id).unwrap().completed_at.is_some());
    }

    #[test]
    fn test_missing_item_errors() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_item(42), Err(ShelfError::ItemNotFound(42))));
        assert!(matches!(db.delete_item(42), Err(ShelfError::ItemNotFound(42))));
        assert!(matches!(
            db.apply_patch(42, ItemPatch::default()),
            Err(ShelfError::ItemNotFound(42))
        ));
    }
}
