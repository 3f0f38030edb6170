use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use crate::error::{ReminderError, Result};
use crate::store::timestamp;

/// A Discord channel receiving a project's notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelBinding {
    pub guild_id: String,
    pub channel_id: String,
    pub project_id: i64,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
}

/// A user receiving a project's notifications by DM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmBinding {
    pub discord_user_id: String,
    pub project_id: i64,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
}

/// Project ⇄ channel and project ⇄ DM subscriptions.
pub struct BindingStore {
    db: Arc<Mutex<Connection>>,
}

impl BindingStore {
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

    pub fn bind_channel(
        &self,
        guild_id: &str,
        channel_id: &str,
        project_id: i64,
        project_name: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO channel_bindings (guild_id, channel_id, project_id, project_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(channel_id, project_id) DO UPDATE SET project_name = excluded.project_name",
            params![guild_id, channel_id, project_id, project_name, Utc::now().to_rfc3339()],
        )?;
        info!(guild_id, channel_id, project_id, "channel bound");
        Ok(())
    }

    pub fn unbind_channel(&self, channel_id: &str, project_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM channel_bindings WHERE channel_id = ?1 AND project_id = ?2",
            params![channel_id, project_id],
        )?;
        Ok(n > 0)
    }

    pub fn list_guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelBinding>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT guild_id, channel_id, project_id, project_name, created_at
             FROM channel_bindings WHERE guild_id = ?1 ORDER BY project_name",
        )?;
        let rows = stmt
            .query_map([guild_id], row_to_channel)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every channel, in any guild, bound to `project_id`.
    pub fn channels_for_project(&self, project_id: i64) -> Result<Vec<ChannelBinding>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT guild_id, channel_id, project_id, project_name, created_at
             FROM channel_bindings WHERE project_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map([project_id], row_to_channel)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The channel bound to `project_id` inside `guild_id`; the oldest
    /// binding wins when there are several.
    pub fn channel_for_project(&self, guild_id: &str, project_id: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let channel = conn
            .query_row(
                "SELECT channel_id FROM channel_bindings
                 WHERE guild_id = ?1 AND project_id = ?2
                 ORDER BY created_at LIMIT 1",
                params![guild_id, project_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(channel)
    }

    pub fn subscribe_dm(&self, discord_user_id: &str, project_id: i64, project_name: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO dm_bindings (discord_user_id, project_id, project_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(discord_user_id, project_id) DO UPDATE SET project_name = excluded.project_name",
            params![discord_user_id, project_id, project_name, Utc::now().to_rfc3339()],
        )?;
        info!(discord_user_id, project_id, "dm subscription stored");
        Ok(())
    }

    pub fn unsubscribe_dm(&self, discord_user_id: &str, project_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM dm_bindings WHERE discord_user_id = ?1 AND project_id = ?2",
            params![discord_user_id, project_id],
        )?;
        Ok(n > 0)
    }

    pub fn list_dm_projects(&self, discord_user_id: &str) -> Result<Vec<DmBinding>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT discord_user_id, project_id, project_name, created_at
             FROM dm_bindings WHERE discord_user_id = ?1 ORDER BY project_name",
        )?;
        let rows = stmt
            .query_map([discord_user_id], row_to_dm)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Discord users DM-subscribed to `project_id`.
    pub fn dm_subscribers(&self, project_id: i64) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT discord_user_id FROM dm_bindings WHERE project_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map([project_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
    }
}

fn row_to_channel(row: &Row<'_>) -> rusqlite::Result<ChannelBinding> {
    Ok(ChannelBinding {
        guild_id: row.get(0)?,
        channel_id: row.get(1)?,
        project_id: row.get(2)?,
        project_name: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

fn row_to_dm(row: &Row<'_>) -> rusqlite::Result<DmBinding> {
    Ok(DmBinding {
        discord_user_id: row.get(0)?,
        project_id: row.get(1)?,
        project_name: row.get(2)?,
        created_at: timestamp(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> BindingStore {
        BindingStore::new(Arc::new(Mutex::new(Connection::open_in_memory().unwrap()))).unwrap()
    }

    #[test]
    fn channel_binding_lookups() {
        let s = store();
        s.bind_channel("900", "901", 3, "Ops").unwrap();
        s.bind_channel("900", "902", 4, "Web").unwrap();
        s.bind_channel("800", "801", 3, "Ops").unwrap();

        assert_eq!(s.channel_for_project("900", 3).unwrap().as_deref(), Some("901"));
        assert_eq!(s.channel_for_project("900", 5).unwrap(), None);
        assert_eq!(s.channels_for_project(3).unwrap().len(), 2);

        let names: Vec<String> = s
            .list_guild_channels("900")
            .unwrap()
            .into_iter()
            .map(|b| b.project_name)
            .collect();
        assert_eq!(names, ["Ops", "Web"]);

        assert!(s.unbind_channel("901", 3).unwrap());
        assert!(!s.unbind_channel("901", 3).unwrap());
        assert_eq!(s.channel_for_project("900", 3).unwrap(), None);
    }

    #[test]
    fn rebinding_updates_name() {
        let s = store();
        s.bind_channel("900", "901", 3, "Ops").unwrap();
        s.bind_channel("900", "901", 3, "Operations").unwrap();
        let all = s.list_guild_channels("900").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].project_name, "Operations");
    }

    #[test]
    fn dm_subscriptions() {
        let s = store();
        s.subscribe_dm("111", 3, "Ops").unwrap();
        s.subscribe_dm("222", 3, "Ops").unwrap();
        s.subscribe_dm("111", 4, "Web").unwrap();

        assert_eq!(s.dm_subscribers(3).unwrap().len(), 2);
        assert_eq!(s.list_dm_projects("111").unwrap().len(), 2);
        assert!(s.unsubscribe_dm("111", 3).unwrap());
        assert_eq!(s.dm_subscribers(3).unwrap(), vec!["222".to_string()]);
    }
}
