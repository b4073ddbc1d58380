use std::str::FromStr;
use std::sync::MutexGuard;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{Result, ShelfError};
use crate::models::{CollectionItem, CollectionStatus, MediaCategory};

use super::Repository;

/// Columns written on insert and update, in bind order.
const WRITE_COLUMNS: [&str; 36] = [
    "title",
    "original_title",
    "media_type",
    "source_id",
    "source_url",
    "imdb_id",
    "goodreads_id",
    "cover_url",
    "local_cover_path",
    "my_rating",
    "status",
    "comment",
    "tags",
    "created_at",
    "updated_at",
    "completed_at",
    "year",
    "summary",
    "douban_rating",
    "imdb_rating",
    "director",
    "cast_list",
    "country",
    "duration",
    "genres",
    "author",
    "publisher",
    "pub_date",
    "isbn",
    "pages",
    "translator",
    "performer",
    "genre",
    "media_format",
    "release_date",
    "id",
];

/// Sort order for item listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    Title,
    RatingDesc,
}

impl ItemSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::CreatedDesc => "created_at DESC, id DESC",
            Self::CreatedAsc => "created_at ASC, id ASC",
            Self::Title => "title COLLATE NOCASE ASC, id ASC",
            Self::RatingDesc => "my_rating IS NULL, my_rating DESC, id DESC",
        }
    }
}

impl FromStr for ItemSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created_desc" | "newest" => Ok(Self::CreatedDesc),
            "created_asc" | "oldest" => Ok(Self::CreatedAsc),
            "title" => Ok(Self::Title),
            "rating" | "rating_desc" => Ok(Self::RatingDesc),
            _ => Err(format!("Invalid ItemSort: {s}")),
        }
    }
}

/// Filter for listing items. Empty filter lists everything, newest first.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub media_type: Option<MediaCategory>,
    pub status: Option<CollectionStatus>,
    pub tag: Option<String>,
    pub sort: ItemSort,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ItemFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(media_type) = self.media_type {
            values.push(Value::Text(media_type.to_string()));
            clauses.push(format!("media_type = ?{}", values.len()));
        }
        if let Some(status) = self.status {
            values.push(Value::Text(status.to_string()));
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(tag) = self.tag.as_deref() {
            // Exact, case-sensitive match against one element of the JSON array.
            values.push(Value::Text(tag.trim().to_string()));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(collection_items.tags) WHERE json_each.value = ?{})",
                values.len()
            ));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

pub trait ItemRepository: Repository<Entity = CollectionItem, Id = i64> {
    fn insert(&self, item: &CollectionItem) -> Result<i64>;
    fn update(&self, item: &CollectionItem) -> Result<()>;
    fn find_by_source_id(&self, source_id: &str) -> Result<Option<CollectionItem>>;
    fn list(&self, filter: &ItemFilter) -> Result<Vec<CollectionItem>>;
    fn count(&self, filter: &ItemFilter) -> Result<usize>;
    fn set_cover_path(&self, id: i64, path: Option<&str>) -> Result<()>;
}

pub struct SqliteItemRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteItemRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn select_sql(tail: &str) -> String {
        format!(
            "SELECT {} FROM collection_items{tail}",
            WRITE_COLUMNS.join(", ")
        )
    }

    fn row_to_item(row: &Row) -> rusqlite::Result<CollectionItem> {
        let media_type: String = row.get("media_type")?;
        let status: String = row.get("status")?;
        let tags: String = row.get("tags")?;

        Ok(CollectionItem {
            id: Some(row.get("id")?),
            title: row.get("title")?,
            original_title: row.get("original_title")?,
            media_type: parse_column(&media_type, "media_type")?,
            source_id: row.get("source_id")?,
            source_url: row.get("source_url")?,
            imdb_id: row.get("imdb_id")?,
            goodreads_id: row.get("goodreads_id")?,
            cover_url: row.get("cover_url")?,
            local_cover_path: row.get("local_cover_path")?,
            my_rating: row.get::<_, Option<f64>>("my_rating")?.map(|v| v as f32),
            status: parse_column(&status, "status")?,
            comment: row.get("comment")?,
            tags: serde_json::from_str(&tags).unwrap_or_default(),
            created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
            updated_at: parse_timestamp(&row.get::<_, String>("updated_at")?)?,
            completed_at: row
                .get::<_, Option<String>>("completed_at")?
                .map(|s| parse_timestamp(&s))
                .transpose()?,
            year: row.get("year")?,
            summary: row.get("summary")?,
            douban_rating: row.get::<_, Option<f64>>("douban_rating")?.map(|v| v as f32),
            imdb_rating: row.get::<_, Option<f64>>("imdb_rating")?.map(|v| v as f32),
            director: row.get("director")?,
            cast: row.get("cast_list")?,
            country: row.get("country")?,
            duration: row.get("duration")?,
            genres: row.get("genres")?,
            author: row.get("author")?,
            publisher: row.get("publisher")?,
            pub_date: row.get("pub_date")?,
            isbn: row.get("isbn")?,
            pages: row.get("pages")?,
            translator: row.get("translator")?,
            performer: row.get("performer")?,
            genre: row.get("genre")?,
            media_format: row.get("media_format")?,
            release_date: row.get("release_date")?,
        })
    }

    /// Values for every column of [`WRITE_COLUMNS`] except the trailing `id`.
    fn item_values(item: &CollectionItem) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(item.title.clone()),
            text(&item.original_title),
            Value::Text(item.media_type.to_string()),
            text(&item.source_id),
            text(&item.source_url),
            text(&item.imdb_id),
            text(&item.goodreads_id),
            text(&item.cover_url),
            text(&item.local_cover_path),
            real(item.my_rating),
            Value::Text(item.status.to_string()),
            text(&item.comment),
            Value::Text(serde_json::to_string(&item.tags)?),
            Value::Text(timestamp(&item.created_at)),
            Value::Text(timestamp(&item.updated_at)),
            item.completed_at
                .map(|t| Value::Text(timestamp(&t)))
                .unwrap_or(Value::Null),
            item.year.map(|y| Value::Integer(y.into())).unwrap_or(Value::Null),
            text(&item.summary),
            real(item.douban_rating),
            real(item.imdb_rating),
            text(&item.director),
            text(&item.cast),
            text(&item.country),
            text(&item.duration),
            text(&item.genres),
            text(&item.author),
            text(&item.publisher),
            text(&item.pub_date),
            text(&item.isbn),
            item.pages.map(|p| Value::Integer(p.into())).unwrap_or(Value::Null),
            text(&item.translator),
            text(&item.performer),
            text(&item.genre),
            text(&item.media_format),
            text(&item.release_date),
        ])
    }

    fn existing_id_for_source(&self, source_id: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM collection_items WHERE source_id = ?1",
                params![source_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn map_write_error(&self, err: rusqlite::Error, item: &CollectionItem) -> ShelfError {
        if is_unique_violation(&err)
            && let Some(source_id) = item.source_id.as_deref()
        {
            return ShelfError::DuplicateItem {
                source_id: source_id.to_string(),
                existing_id: self.existing_id_for_source(source_id).ok().flatten(),
            };
        }
        ShelfError::Database(err)
    }
}

impl<'a> Repository for SqliteItemRepository<'a> {
    type Entity = CollectionItem;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let item = self
            .conn
            .query_row(&Self::select_sql(" WHERE id = ?1"), params![id], Self::row_to_item)
            .optional()?;
        Ok(item)
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM collection_items WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> ItemRepository for SqliteItemRepository<'a> {
    fn insert(&self, item: &CollectionItem) -> Result<i64> {
        let columns = &WRITE_COLUMNS[..WRITE_COLUMNS.len() - 1];
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO collection_items ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let values = Self::item_values(item)?;
        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(|e| self.map_write_error(e, item))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, item: &CollectionItem) -> Result<()> {
        let id = item
            .id
            .ok_or_else(|| ShelfError::Validation("cannot update an item without id".into()))?;

        let columns = &WRITE_COLUMNS[..WRITE_COLUMNS.len() - 1];
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE collection_items SET {assignments} WHERE id = ?{}",
            columns.len() + 1
        );

        let mut values = Self::item_values(item)?;
        values.push(Value::Integer(id));
        let changed = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(|e| self.map_write_error(e, item))?;
        if changed == 0 {
            return Err(ShelfError::ItemNotFound(id));
        }
        Ok(())
    }

    fn find_by_source_id(&self, source_id: &str) -> Result<Option<CollectionItem>> {
        let item = self
            .conn
            .query_row(
                &Self::select_sql(" WHERE source_id = ?1"),
                params![source_id],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    fn list(&self, filter: &ItemFilter) -> Result<Vec<CollectionItem>> {
        let (where_sql, mut values) = filter.where_clause();
        let mut tail = format!("{where_sql} ORDER BY {}", filter.sort.order_by());
        // SQLite treats a negative LIMIT as "no limit".
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        values.push(Value::Integer(limit));
        tail.push_str(&format!(" LIMIT ?{}", values.len()));
        values.push(Value::Integer(filter.offset as i64));
        tail.push_str(&format!(" OFFSET ?{}", values.len()));

        let mut stmt = self.conn.prepare(&Self::select_sql(&tail))?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count(&self, filter: &ItemFilter) -> Result<usize> {
        let (where_sql, values) = filter.where_clause();
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM collection_items{where_sql}"),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn set_cover_path(&self, id: i64, path: Option<&str>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE collection_items SET local_cover_path = ?1, updated_at = ?2 WHERE id = ?3",
            params![path, timestamp(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(ShelfError::ItemNotFound(id));
        }
        Ok(())
    }
}

fn text(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map(|s| Value::Text(s.clone()))
        .unwrap_or(Value::Null)
}

fn real(value: Option<f32>) -> Value {
    value.map(|v| Value::Real(v.into())).unwrap_or(Value::Null)
}

fn parse_column<T: FromStr<Err = String>>(raw: &str, column: &str) -> rusqlite::Result<T> {
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("column {column}: {e}").into(),
        )
    })
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
