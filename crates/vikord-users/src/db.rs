use rusqlite::Connection;

use crate::error::Result;

/// Initialise the identity schema. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    // UNIQUE(discord_user_id): one Discord account maps to at most one
    // Vikunja account, so reverse lookups are unambiguous.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_mappings (
            vikunja_user_id   INTEGER PRIMARY KEY NOT NULL,
            vikunja_username  TEXT NOT NULL,
            discord_user_id   TEXT NOT NULL UNIQUE,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );",
    )?;
    Ok(())
}
