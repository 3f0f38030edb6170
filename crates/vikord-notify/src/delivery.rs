use async_trait::async_trait;

use crate::format::RenderedMessage;

/// Where a rendered message goes. Ids are Discord snowflakes as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    Channel(String),
    DirectMessage(String),
}

impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryTarget::Channel(id) => write!(f, "channel:{id}"),
            DeliveryTarget::DirectMessage(id) => write!(f, "dm:{id}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("invalid target id: {0}")]
    InvalidTarget(String),

    #[error("target not reachable: {0}")]
    Unreachable(String),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound side of the bot. Implemented by the Discord adapter; tests use
/// an in-memory recorder.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, target: &DeliveryTarget, message: &RenderedMessage)
        -> Result<(), DeliveryError>;
}
