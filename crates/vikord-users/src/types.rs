use serde::{Deserialize, Serialize};

/// One stored association between a Vikunja account and a Discord account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping {
    pub vikunja_user_id: i64,
    pub vikunja_username: String,
    pub discord_user_id: String,
    pub created_at: String,
    pub updated_at: String,
}
