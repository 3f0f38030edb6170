use rusqlite::Connection;

use crate::error::Result;

/// Initialise reminder, digest and binding tables. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminders (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_discord_id  TEXT    NOT NULL,
            task_id           INTEGER NOT NULL,
            project_id        INTEGER NOT NULL,
            target_type       TEXT    NOT NULL,   -- 'dm' | 'guild'
            guild_id          TEXT,
            cron_expression   TEXT    NOT NULL,
            starts_at         TEXT,               -- RFC 3339 or NULL
            next_run_at       TEXT,               -- RFC 3339 or NULL
            message           TEXT,
            mention_mode      TEXT    NOT NULL DEFAULT 'assignees',
            enabled           INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reminders_owner ON reminders (owner_discord_id);

        CREATE TABLE IF NOT EXISTS digests (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_discord_id  TEXT    NOT NULL,
            project_id        INTEGER NOT NULL,
            target_type       TEXT    NOT NULL,
            guild_id          TEXT,
            channel_id        TEXT,
            cron_expression   TEXT    NOT NULL,
            interval_days     INTEGER,            -- NULL: follow the expression
            min_priority      INTEGER NOT NULL DEFAULT 0,
            next_run_at       TEXT,
            enabled           INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_digests_owner ON digests (owner_discord_id);

        CREATE TABLE IF NOT EXISTS channel_bindings (
            guild_id      TEXT    NOT NULL,
            channel_id    TEXT    NOT NULL,
            project_id    INTEGER NOT NULL,
            project_name  TEXT    NOT NULL,
            created_at    TEXT    NOT NULL,
            PRIMARY KEY (channel_id, project_id)
        );
        CREATE INDEX IF NOT EXISTS idx_channel_bindings_project ON channel_bindings (project_id);

        CREATE TABLE IF NOT EXISTS dm_bindings (
            discord_user_id  TEXT    NOT NULL,
            project_id       INTEGER NOT NULL,
            project_name     TEXT    NOT NULL,
            created_at       TEXT    NOT NULL,
            PRIMARY KEY (discord_user_id, project_id)
        );
        ",
    )?;
    Ok(())
}
