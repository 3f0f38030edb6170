use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::identity::IdentityStore;

/// Translates Vikunja user ids into Discord user ids.
///
/// Runs once per notification, not per message, so there is no cache: every
/// call reads the table fresh and a link or unlink is visible immediately.
pub struct IdentityResolver {
    store: Arc<IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<IdentityStore>) -> Self {
        Self { store }
    }

    /// Resolve every id in one query. The result is partial: unmapped ids are
    /// absent. Store failures degrade to an empty map so a notification is
    /// still delivered with plain names.
    pub fn resolve_many(&self, vikunja_user_ids: &HashSet<i64>) -> HashMap<i64, String> {
        if vikunja_user_ids.is_empty() {
            return HashMap::new();
        }

        let mut ids: Vec<i64> = vikunja_user_ids.iter().copied().collect();
        ids.sort_unstable();

        match self.store.find_discord_user_ids(&ids) {
            Ok(found) => {
                debug!(requested = ids.len(), resolved = found.len(), "identities resolved");
                found
            }
            Err(e) => {
                warn!(error = %e, requested = ids.len(), "identity lookup failed, using plain names");
                HashMap::new()
            }
        }
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::Mutex;

    #[test]
    fn only_mapped_ids_come_back() {
        let conn = Connection::open_in_memory().unwrap();
        let store = Arc::new(IdentityStore::new(Arc::new(Mutex::new(conn))).unwrap());
        store.upsert_mapping(7, "seven", "700").unwrap();
        let resolver = IdentityResolver::new(store);

        let got = resolver.resolve_many(&HashSet::from([5, 7, 9]));
        assert_eq!(got.len(), 1);
        assert_eq!(got.get(&7).map(String::as_str), Some("700"));
        assert!(!got.contains_key(&5));
        assert!(!got.contains_key(&9));
    }

    #[test]
    fn broken_store_degrades_to_empty() {
        let conn = Connection::open_in_memory().unwrap();
        let store = Arc::new(IdentityStore::new(Arc::new(Mutex::new(conn))).unwrap());
        {
            let conn = store.conn().unwrap();
            conn.execute_batch("DROP TABLE user_mappings;").unwrap();
        }
        let resolver = IdentityResolver::new(store);
        assert!(resolver.resolve_many(&HashSet::from([1])).is_empty());
    }
}
