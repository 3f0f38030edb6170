use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::info;

use crate::error::{Result, UserError};
use crate::types::UserMapping;

/// Persisted Vikunja user id ⇄ Discord user id table.
pub struct IdentityStore {
    db: Arc<Mutex<Connection>>,
}

impl IdentityStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let conn = db.lock().map_err(|_| UserError::Poisoned)?;
            crate::db::init_db(&conn)?;
        }
        Ok(Self { db })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| UserError::Poisoned)
    }

    /// Vikunja account linked to a Discord account, if any.
    pub fn find_vikunja_user_id(&self, discord_user_id: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT vikunja_user_id FROM user_mappings WHERE discord_user_id = ?1",
                [discord_user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Batch reverse lookup. Ids without a mapping are simply absent.
    pub fn find_discord_user_ids(&self, vikunja_user_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if vikunja_user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; vikunja_user_ids.len()].join(",");
        let sql = format!(
            "SELECT vikunja_user_id, discord_user_id FROM user_mappings
             WHERE vikunja_user_id IN ({placeholders})"
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(vikunja_user_ids.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    /// Link `discord_user_id` to a Vikunja account.
    ///
    /// A Discord account that was linked elsewhere is moved. A Vikunja account
    /// already claimed by a different Discord account is refused.
    pub fn upsert_mapping(
        &self,
        vikunja_user_id: i64,
        vikunja_username: &str,
        discord_user_id: &str,
    ) -> Result<UserMapping> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT discord_user_id FROM user_mappings WHERE vikunja_user_id = ?1",
                [vikunja_user_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(owner) = owner {
            if owner != discord_user_id {
                return Err(UserError::AlreadyLinked {
                    discord_user_id: owner,
                    vikunja_user_id,
                });
            }
        }

        tx.execute(
            "DELETE FROM user_mappings WHERE discord_user_id = ?1 AND vikunja_user_id != ?2",
            params![discord_user_id, vikunja_user_id],
        )?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO user_mappings
                (vikunja_user_id, vikunja_username, discord_user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(vikunja_user_id) DO UPDATE SET
                vikunja_username = excluded.vikunja_username,
                updated_at = excluded.updated_at",
            params![vikunja_user_id, vikunja_username, discord_user_id, now],
        )?;

        let mapping = tx.query_row(
            "SELECT vikunja_user_id, vikunja_username, discord_user_id, created_at, updated_at
             FROM user_mappings WHERE vikunja_user_id = ?1",
            [vikunja_user_id],
            row_to_mapping,
        )?;
        tx.commit()?;

        info!(vikunja_user_id, discord_user_id, "identity mapping stored");
        Ok(mapping)
    }

    /// Remove the mapping for a Discord account. Returns whether one existed.
    pub fn remove_mapping_by_discord_id(&self, discord_user_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM user_mappings WHERE discord_user_id = ?1",
            [discord_user_id],
        )?;
        if n > 0 {
            info!(discord_user_id, "identity mapping removed");
        }
        Ok(n > 0)
    }
}

fn row_to_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserMapping> {
    Ok(UserMapping {
        vikunja_user_id: row.get(0)?,
        vikunja_username: row.get(1)?,
        discord_user_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> IdentityStore {
        let conn = Connection::open_in_memory().unwrap();
        IdentityStore::new(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn upsert_then_lookup_both_ways() {
        let s = store();
        s.upsert_mapping(7, "bea", "111").unwrap();
        assert_eq!(s.find_vikunja_user_id("111").unwrap(), Some(7));
        let map = s.find_discord_user_ids(&[7, 8]).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7).map(String::as_str), Some("111"));
    }

    #[test]
    fn relinking_moves_discord_account() {
        let s = store();
        s.upsert_mapping(7, "bea", "111").unwrap();
        s.upsert_mapping(8, "bea2", "111").unwrap();
        assert_eq!(s.find_vikunja_user_id("111").unwrap(), Some(8));
        assert!(s.find_discord_user_ids(&[7]).unwrap().is_empty());
    }

    #[test]
    fn claimed_vikunja_account_is_refused() {
        let s = store();
        s.upsert_mapping(7, "bea", "111").unwrap();
        let err = s.upsert_mapping(7, "bea", "222").unwrap_err();
        assert!(matches!(err, UserError::AlreadyLinked { vikunja_user_id: 7, .. }));
        assert_eq!(s.find_vikunja_user_id("222").unwrap(), None);
    }

    #[test]
    fn upsert_updates_username() {
        let s = store();
        s.upsert_mapping(7, "bea", "111").unwrap();
        let m = s.upsert_mapping(7, "beatriz", "111").unwrap();
        assert_eq!(m.vikunja_username, "beatriz");
    }

    #[test]
    fn remove_reports_existence() {
        let s = store();
        s.upsert_mapping(7, "bea", "111").unwrap();
        assert!(s.remove_mapping_by_discord_id("111").unwrap());
        assert!(!s.remove_mapping_by_discord_id("111").unwrap());
        assert_eq!(s.find_vikunja_user_id("111").unwrap(), None);
    }

    #[test]
    fn empty_batch_is_empty_map() {
        assert!(store().find_discord_user_ids(&[]).unwrap().is_empty());
    }
}
