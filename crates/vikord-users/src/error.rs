use thiserror::Error;

/// Identity-layer errors. Kept separate from `VikordError` so the resolver
/// can swallow them without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("identity store lock poisoned")]
    Poisoned,

    #[error("Discord account {discord_user_id} is already linked to Vikunja user {vikunja_user_id}")]
    AlreadyLinked {
        discord_user_id: String,
        vikunja_user_id: i64,
    },
}

pub type Result<T> = std::result::Result<T, UserError>;
