use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression could not be parsed.
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// The expression parses but never fires again after the given start.
    #[error("Cron expression '{0}' has no future occurrence")]
    Exhausted(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
