use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{ReminderError, Result};
use crate::records::{DigestRecord, NewDigest, NewReminder, ReminderRecord};

const REMINDER_COLUMNS: &str = "id, owner_discord_id, task_id, project_id, target_type, guild_id,
     cron_expression, starts_at, next_run_at, message, mention_mode, enabled, created_at";

const DIGEST_COLUMNS: &str = "id, owner_discord_id, project_id, target_type, guild_id, channel_id,
     cron_expression, interval_days, min_priority, next_run_at, enabled, created_at";

/// Reminder and digest records. The single source of truth; scheduler jobs
/// are rebuilt from here on every start.
pub struct ReminderStore {
    db: Arc<Mutex<Connection>>,
}

impl ReminderStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let conn = db.lock().map_err(|_| ReminderError::Poisoned)?;
            crate::db::init_db(&conn)?;
        }
        Ok(Self { db })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| ReminderError::Poisoned)
    }

    // --- reminders -----------------------------------------------------------

    pub fn insert_reminder(
        &self,
        new: &NewReminder,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<ReminderRecord> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reminders
             (owner_discord_id, task_id, project_id, target_type, guild_id, cron_expression,
              starts_at, next_run_at, message, mention_mode, enabled, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,1,?11)",
            params![
                new.owner_discord_id,
                new.task_id,
                new.project_id,
                new.target_type.as_str(),
                new.guild_id,
                new.cron_expression,
                new.starts_at.map(|d| d.to_rfc3339()),
                next_run_at.map(|d| d.to_rfc3339()),
                new.message,
                new.mention_mode.as_str(),
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(reminder_id = id, task_id = new.task_id, "reminder stored");

        Ok(ReminderRecord {
            id,
            owner_discord_id: new.owner_discord_id.clone(),
            task_id: new.task_id,
            project_id: new.project_id,
            target_type: new.target_type,
            guild_id: new.guild_id.clone(),
            cron_expression: new.cron_expression.clone(),
            starts_at: new.starts_at,
            next_run_at,
            message: new.message.clone(),
            mention_mode: new.mention_mode,
            enabled: true,
            created_at: now,
        })
    }

    pub fn get_reminder(&self, id: i64) -> Result<Option<ReminderRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1"),
                [id],
                row_to_reminder,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_enabled_reminders(&self) -> Result<Vec<ReminderRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE enabled = 1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([], row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_reminders_by_owner(&self, owner_discord_id: &str) -> Result<Vec<ReminderRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE owner_discord_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([owner_discord_id], row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_reminder_next_run(&self, id: i64, next_run_at: Option<DateTime<Utc>>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE reminders SET next_run_at = ?1 WHERE id = ?2",
            params![next_run_at.map(|d| d.to_rfc3339()), id],
        )?;
        Ok(())
    }

    pub fn disable_reminder(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("UPDATE reminders SET enabled = 0 WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn delete_reminder(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM reminders WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    // --- digests -------------------------------------------------------------

    pub fn insert_digest(
        &self,
        new: &NewDigest,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<DigestRecord> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO digests
             (owner_discord_id, project_id, target_type, guild_id, channel_id, cron_expression,
              interval_days, min_priority, next_run_at, enabled, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,1,?10)",
            params![
                new.owner_discord_id,
                new.project_id,
                new.target_type.as_str(),
                new.guild_id,
                new.channel_id,
                new.cron_expression,
                new.interval_days,
                new.min_priority,
                next_run_at.map(|d| d.to_rfc3339()),
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(digest_id = id, project_id = new.project_id, "digest stored");

        Ok(DigestRecord {
            id,
            owner_discord_id: new.owner_discord_id.clone(),
            project_id: new.project_id,
            target_type: new.target_type,
            guild_id: new.guild_id.clone(),
            channel_id: new.channel_id.clone(),
            cron_expression: new.cron_expression.clone(),
            interval_days: new.interval_days,
            min_priority: new.min_priority,
            next_run_at,
            enabled: true,
            created_at: now,
        })
    }

    pub fn get_digest(&self, id: i64) -> Result<Option<DigestRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {DIGEST_COLUMNS} FROM digests WHERE id = ?1"),
                [id],
                row_to_digest,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_enabled_digests(&self) -> Result<Vec<DigestRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DIGEST_COLUMNS} FROM digests WHERE enabled = 1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([], row_to_digest)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_digests_by_owner(&self, owner_discord_id: &str) -> Result<Vec<DigestRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DIGEST_COLUMNS} FROM digests WHERE owner_discord_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([owner_discord_id], row_to_digest)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_digest_next_run(&self, id: i64, next_run_at: Option<DateTime<Utc>>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE digests SET next_run_at = ?1 WHERE id = ?2",
            params![next_run_at.map(|d| d.to_rfc3339()), id],
        )?;
        Ok(())
    }

    pub fn disable_digest(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("UPDATE digests SET enabled = 0 WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn delete_digest(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM digests WHERE id = ?1", [id])?;
        Ok(n > 0)
    }
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<ReminderRecord> {
    Ok(ReminderRecord {
        id: row.get(0)?,
        owner_discord_id: row.get(1)?,
        task_id: row.get(2)?,
        project_id: row.get(3)?,
        target_type: parse_col(row, 4)?,
        guild_id: row.get(5)?,
        cron_expression: row.get(6)?,
        starts_at: opt_timestamp(row, 7)?,
        next_run_at: opt_timestamp(row, 8)?,
        message: row.get(9)?,
        mention_mode: parse_col(row, 10)?,
        enabled: row.get(11)?,
        created_at: timestamp(row, 12)?,
    })
}

fn row_to_digest(row: &Row<'_>) -> rusqlite::Result<DigestRecord> {
    Ok(DigestRecord {
        id: row.get(0)?,
        owner_discord_id: row.get(1)?,
        project_id: row.get(2)?,
        target_type: parse_col(row, 3)?,
        guild_id: row.get(4)?,
        channel_id: row.get(5)?,
        cron_expression: row.get(6)?,
        interval_days: row.get(7)?,
        min_priority: row.get(8)?,
        next_run_at: opt_timestamp(row, 9)?,
        enabled: row.get(10)?,
        created_at: timestamp(row, 11)?,
    })
}

pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => timestamp(row, idx).map(Some),
    }
}

fn parse_col<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
