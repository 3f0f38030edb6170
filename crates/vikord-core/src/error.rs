use thiserror::Error;

#[derive(Debug, Error)]
pub enum VikordError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Upstream returned HTTP {status} for {path}")]
    UpstreamStatus { status: u16, path: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, VikordError>;
