use rusqlite::Connection;

use super::Migration;
use crate::error::Result;

pub struct V2UniqueSourceId;

impl Migration for V2UniqueSourceId {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Enforce one row per catalogue source id"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        // Older rows may already repeat a source id; the oldest row keeps it.
        conn.execute_batch(
            "
            UPDATE collection_items
               SET source_id = NULL
             WHERE source_id IS NOT NULL
               AND id NOT IN (
                   SELECT MIN(id) FROM collection_items
                    WHERE source_id IS NOT NULL
                    GROUP BY source_id
               );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_items_source_id
                ON collection_items(source_id) WHERE source_id IS NOT NULL;
            ",
        )?;
        Ok(())
    }
}
