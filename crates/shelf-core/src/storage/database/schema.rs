use rusqlite::Connection;

use crate::error::Result;

/// Version of the newest migration.
pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS collection_items (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            title            TEXT NOT NULL,
            original_title   TEXT,
            media_type       TEXT NOT NULL CHECK(media_type IN ('movie', 'book', 'music')),

            source_id        TEXT,
            source_url       TEXT,
            imdb_id          TEXT,
            goodreads_id     TEXT,

            cover_url        TEXT,
            local_cover_path TEXT,

            my_rating        REAL CHECK(my_rating IS NULL OR (my_rating >= 0.0 AND my_rating <= 5.0)),
            status           TEXT NOT NULL DEFAULT 'wish' CHECK(status IN ('wish', 'doing', 'done')),
            comment          TEXT,
            tags             TEXT NOT NULL DEFAULT '[]',
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL,
            completed_at     TEXT,

            year             INTEGER,
            summary          TEXT,
            douban_rating    REAL,
            imdb_rating      REAL,

            director         TEXT,
            cast_list        TEXT,
            country          TEXT,
            duration         TEXT,
            genres           TEXT,

            author           TEXT,
            publisher        TEXT,
            pub_date         TEXT,
            isbn             TEXT,
            pages            INTEGER,
            translator       TEXT,

            performer        TEXT,
            genre            TEXT,
            media_format     TEXT,
            release_date     TEXT
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_items_media_type ON collection_items(media_type);
        CREATE INDEX IF NOT EXISTS idx_items_status     ON collection_items(status);
        CREATE INDEX IF NOT EXISTS idx_items_created_at ON collection_items(created_at);
        CREATE INDEX IF NOT EXISTS idx_items_year       ON collection_items(year);
        CREATE INDEX IF NOT EXISTS idx_items_isbn       ON collection_items(isbn);
        ",
    )?;
    Ok(())
}
