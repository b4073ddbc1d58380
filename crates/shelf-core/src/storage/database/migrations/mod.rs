mod v1_initial;
mod v2_unique_source_id;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, ShelfError};

pub trait Migration {
    fn version(&self) -> u32;
    fn description(&self) -> &'static str;
    fn up(&self, conn: &Connection) -> Result<()>;
}

/// Every migration, oldest first.
const MIGRATIONS: &[&dyn Migration] = &[
    &v1_initial::V1Initial,
    &v2_unique_source_id::V2UniqueSourceId,
];

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Brings the schema up to date. Each migration runs in its own transaction
/// together with its bookkeeping row.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    ensure_migrations_table(conn)?;
    let current = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version() > current) {
        let version = migration.version();
        debug!(version, "applying migration: {}", migration.description());

        let tx = conn.unchecked_transaction()?;
        migration.up(&tx).map_err(|e| ShelfError::Migration {
            version,
            message: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)],
        )?;
        tx.commit()?;
    }

    Ok(())
}

pub fn get_applied_versions(conn: &Connection) -> Result<Vec<u32>> {
    ensure_migrations_table(conn)?;
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<u32>>>()?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::SCHEMA_VERSION;

    #[test]
    fn test_fresh_database_reaches_schema_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let versions = get_applied_versions(&conn).unwrap();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(versions.last().copied(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_rerun_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_applied_versions(&conn).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_v2_clears_repeated_source_ids() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_migrations_table(&conn).unwrap();
        v1_initial::V1Initial.up(&conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations(version, applied_at) VALUES (1, '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        for title in ["first", "second"] {
            conn.execute(
                "INSERT INTO collection_items(title, media_type, source_id, created_at, updated_at)
                 VALUES (?1, 'movie', '1292052', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [title],
            )
            .unwrap();
        }

        run_migrations(&conn).unwrap();

        let kept: String = conn
            .query_row(
                "SELECT title FROM collection_items WHERE source_id = '1292052'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(kept, "first");
        let dup = conn.execute(
            "INSERT INTO collection_items(title, media_type, source_id, created_at, updated_at)
             VALUES ('third', 'movie', '1292052', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(dup.is_err());
    }
}
