use thiserror::Error;
use vikord_core::VikordError;
use vikord_scheduler::SchedulerError;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("reminder store lock poisoned")]
    Poisoned,

    /// Bad cadence or date input. The message is shown to the user as-is.
    #[error("{0}")]
    InvalidCadence(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("{kind} {id} belongs to another user")]
    NotOwner { kind: &'static str, id: i64 },

    #[error("Upstream error: {0}")]
    Upstream(#[from] VikordError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
