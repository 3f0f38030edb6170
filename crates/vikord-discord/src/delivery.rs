use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::{ChannelId, UserId};
use tracing::debug;
use vikord_notify::{Delivery, DeliveryError, DeliveryTarget, RenderedMessage};

use crate::embed::to_create_message;

/// Sends rendered notifications through Discord's REST API.
///
/// Holds only an `Arc<Http>`, so it works whether or not the gateway
/// connection is currently up.
pub struct DiscordDelivery {
    http: Arc<Http>,
}

impl DiscordDelivery {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// Discord snowflakes are non-zero `u64`s.
pub fn parse_snowflake(raw: &str) -> Result<u64, DeliveryError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(DeliveryError::InvalidTarget(raw.to_string())),
    }
}

#[async_trait]
impl Delivery for DiscordDelivery {
    async fn send(
        &self,
        target: &DeliveryTarget,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError> {
        let builder = to_create_message(message);
        match target {
            DeliveryTarget::Channel(raw) => {
                let channel = ChannelId::new(parse_snowflake(raw)?);
                channel
                    .send_message(&self.http, builder)
                    .await
                    .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;
            }
            DeliveryTarget::DirectMessage(raw) => {
                let user = UserId::new(parse_snowflake(raw)?);
                user.direct_message(&self.http, builder)
                    .await
                    .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;
            }
        }
        debug!(target = %target, "notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflakes_must_be_positive_integers() {
        assert_eq!(parse_snowflake("1234567890").unwrap(), 1234567890);
        assert!(matches!(parse_snowflake("0"), Err(DeliveryError::InvalidTarget(_))));
        assert!(parse_snowflake("abc").is_err());
        assert!(parse_snowflake("").is_err());
    }
}
